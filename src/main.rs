mod app;
mod repl;
mod view;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use skycast_core::Config;
use skycast_history::{FileStorage, HistoryStore, MemoryStorage};

use crate::app::WeatherApp;

#[derive(Parser)]
#[command(name = "skycast")]
#[command(about = "Current weather lookup with an undoable search history")]
struct Args {
    #[arg(help = "City to look up once, then exit")]
    city: Option<String>,

    #[arg(long, help = "Path to a config file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Keep search history in memory only")]
    no_persist: bool,
}

fn open_history(config: &Config, persist: bool) -> HistoryStore {
    let key = config.storage.key.clone();
    let max = config.storage.max_history_items;

    if persist {
        let dir = config.storage.effective_dir();
        tracing::debug!("History directory: {}", dir.display());
        HistoryStore::open(FileStorage::new(dir), key, max)
    } else {
        HistoryStore::open(MemoryStorage::new(), key, max)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, validation) = Config::load_validated(args.config.as_deref())
        .context("Failed to load configuration")?;

    skycast_core::init_tracing(if config.devtools_enabled() {
        "debug"
    } else {
        "warn"
    });

    for warning in &validation.warnings {
        tracing::warn!("Config {}: {}", warning.field, warning.message);
    }

    let history = open_history(&config, !args.no_persist);
    let (mut app, events) =
        WeatherApp::new(config, history).context("Failed to start weather client")?;

    if let Some(city) = args.city {
        if !app.search(&city).await {
            anyhow::bail!("City name must not be empty");
        }
        print!("{}", view::state(app.state()));
        return Ok(());
    }

    repl::run(&mut app, events).await
}
