//! Plain-text rendering of application state.

use skycast_core::Config;
use skycast_history::UndoCoordinator;
use skycast_weather::{CurrentWeather, WeatherCache};

use crate::app::FetchState;

const PROGRESS_WIDTH: usize = 20;

pub const EMPTY_HISTORY: &str = "No search history yet. Start searching for cities!";

pub fn header(config: &Config) -> String {
    format!("{}\n{}\n", config.app.name, config.app.description)
}

pub fn welcome() -> String {
    "Welcome to Weather App\nSearch for a city to get current weather information\n".to_string()
}

pub fn loading(city: &str) -> String {
    format!("Loading weather data for {}...", city)
}

pub fn error(message: &str) -> String {
    format!("Error: {}\nType `retry` to try again.\n", message)
}

/// Round half up, so -2.5 shows as -2
fn round_temp(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn weather_card(weather: &CurrentWeather) -> String {
    let mut out = String::new();
    out.push_str(&format!("== {} ==\n", weather.name));

    if let Some(condition) = weather.primary_condition() {
        out.push_str(&format!("Icon: {}\n", condition.icon_url()));
    }

    out.push_str(&format!("{}°C\n", round_temp(weather.main.temp)));
    out.push_str(&format!(
        "Min: {}°  Max: {}°\n",
        round_temp(weather.main.temp_min),
        round_temp(weather.main.temp_max)
    ));

    if let Some(condition) = weather.primary_condition() {
        out.push_str(&format!(
            "{} ({})\n",
            condition.description,
            condition.category().label()
        ));
    }

    out.push_str(&format!("Wind Speed: {} m/s\n", weather.wind.speed));
    out.push_str(&format!("Humidity: {}%\n", weather.main.humidity));
    out.push_str(&format!("Pressure: {} hPa\n", weather.main.pressure));
    out
}

/// Everything shown for the current lookup.
pub fn state(state: &FetchState) -> String {
    match state {
        FetchState::Idle => welcome(),
        FetchState::Loaded(weather) => weather_card(weather),
        FetchState::Failed(message) => error(message),
    }
}

pub fn history_list(cities: &[String]) -> String {
    if cities.is_empty() {
        return format!("Search History\n{}\n", EMPTY_HISTORY);
    }

    let mut out = String::from("Search History\n");
    for (i, city) in cities.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", i + 1, city));
    }
    out
}

fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).round() as usize)
        .min(PROGRESS_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}

/// Banner for an open undo window, if any.
pub fn undo_banner(undo: &UndoCoordinator) -> Option<String> {
    let message = undo.snackbar_message()?;
    let remaining = undo.time_remaining()?;
    let progress = undo.progress().unwrap_or(1.0);

    Some(format!(
        "{}  {} {:.1}s  (undo | dismiss)",
        message,
        progress_bar(progress),
        remaining.as_secs_f64()
    ))
}

pub fn undo_closed(city: &str) -> String {
    format!("Removal of \"{}\" is final.", city)
}

/// Cache contents for the `cache` devtools command
pub fn cache_table(cache: &WeatherCache) -> String {
    let entries = cache.entries();
    if entries.is_empty() {
        return "Cache is empty.\n".to_string();
    }

    let stale_after = cache.stale_after();
    let mut out = format!("Cached lookups (stale after {:?})\n", stale_after);
    for (city, age) in entries {
        let status = if age < stale_after { "fresh" } else { "stale" };
        out.push_str(&format!("  {:<24} {:>8.1}s  {}\n", city, age.as_secs_f64(), status));
    }
    out
}

pub fn help(devtools: bool) -> String {
    let mut out = String::from(
        "Commands:\n\
         \x20 <city> | search <city>   look up current weather\n\
         \x20 history                  show search history\n\
         \x20 open <n>                 look up history entry n\n\
         \x20 delete <n>               remove history entry n (undoable)\n\
         \x20 undo                     restore the last removal\n\
         \x20 dismiss                  make the last removal final\n\
         \x20 clear                    clear search history\n\
         \x20 retry                    fetch the current city again\n",
    );
    if devtools {
        out.push_str("  cache                    show cached lookups\n");
    }
    out.push_str("  help                     show this help\n  quit                     exit\n");
    out
}
