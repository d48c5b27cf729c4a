//! Interactive command loop.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::app::{AppEvent, FetchState, WeatherApp};
use crate::view;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    History,
    Open(usize),
    Delete(usize),
    Undo,
    Dismiss,
    Clear,
    Retry,
    Cache,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

/// Parse one input line. History positions are 1-based on input.
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match (word.to_lowercase().as_str(), rest.is_empty()) {
        ("search", false) => Command::Search(rest.to_string()),
        ("search", true) => Command::Invalid("Usage: search <city>".into()),
        ("open", _) => position(rest).map_or_else(
            || Command::Invalid("Usage: open <n>".into()),
            Command::Open,
        ),
        ("delete", _) => position(rest).map_or_else(
            || Command::Invalid("Usage: delete <n>".into()),
            Command::Delete,
        ),
        ("history", true) => Command::History,
        ("undo", true) => Command::Undo,
        ("dismiss", true) => Command::Dismiss,
        ("clear", true) => Command::Clear,
        ("retry", true) => Command::Retry,
        ("cache", true) => Command::Cache,
        ("help", true) | ("?", true) => Command::Help,
        ("quit", true) | ("exit", true) => Command::Quit,
        _ => Command::Search(line.to_string()),
    }
}

fn position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

/// Outcome of running one command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn execute(app: &mut WeatherApp, command: Command) -> Flow {
    match command {
        Command::Empty => {}
        Command::Quit => return Flow::Quit,
        Command::Help => print!("{}", view::help(app.config().devtools_enabled())),
        Command::Invalid(usage) => println!("{}", usage),
        Command::Search(city) => {
            println!("{}", view::loading(city.trim()));
            if app.search(&city).await {
                print!("{}", view::state(app.state()));
            }
        }
        Command::Open(index) => {
            let Some(city) = app.history().get(index).cloned() else {
                println!("No history entry {}", index + 1);
                return Flow::Continue;
            };
            println!("{}", view::loading(&city));
            app.select(index).await;
            print!("{}", view::state(app.state()));
        }
        Command::Retry => match app.current_city().map(str::to_string) {
            Some(city) => {
                println!("{}", view::loading(&city));
                app.retry().await;
                print!("{}", view::state(app.state()));
            }
            None => println!("Nothing to retry yet."),
        },
        Command::History => print!("{}", view::history_list(&app.history())),
        Command::Delete(index) => {
            if app.delete(index).is_none() {
                println!("No history entry {}", index + 1);
            }
        }
        Command::Undo => match app.undo() {
            Some(record) => println!("Restored \"{}\".", record.city),
            None => println!("Nothing to undo."),
        },
        Command::Dismiss => {
            app.dismiss();
        }
        Command::Clear => {
            app.clear_history();
            print!("{}", view::history_list(&app.history()));
        }
        Command::Cache => {
            if app.config().devtools_enabled() {
                print!("{}", view::cache_table(app.cache()));
            } else {
                println!("The cache command needs devtools enabled.");
            }
        }
    }

    if let Some(banner) = view::undo_banner(app.undo_window()) {
        println!("{}", banner);
    }
    Flow::Continue
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(app: &mut WeatherApp, mut events: mpsc::UnboundedReceiver<AppEvent>) -> Result<()> {
    print!("{}", view::header(app.config()));
    if matches!(app.state(), FetchState::Idle) {
        print!("{}", view::welcome());
    }
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if execute(app, parse(&line)).await == Flow::Quit {
                    break;
                }
            }
            Some(event) = events.recv() => match event {
                AppEvent::UndoClosed(city) => println!("{}", view::undo_closed(&city)),
            },
        }
    }

    tracing::debug!("Leaving command loop");
    Ok(())
}
