//! Application controller tying the weather client, cache, history and
//! undo window together.

use std::time::Duration;

use anyhow::Result;
use skycast_core::Config;
use skycast_history::{HistoryStore, PendingDeletion, SharedHistory, UndoCoordinator};
use skycast_weather::{with_retry, CurrentWeather, RetryConfig, WeatherCache, WeatherClient};
use tokio::sync::mpsc;

/// Result of the most recent lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Loaded(CurrentWeather),
    Failed(String),
}

/// Notifications raised outside of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The undo window for this city has closed and settled.
    UndoClosed(String),
}

pub struct WeatherApp {
    config: Config,
    client: WeatherClient,
    cache: WeatherCache,
    retry: RetryConfig,
    history: SharedHistory,
    undo: UndoCoordinator,
    current_city: Option<String>,
    state: FetchState,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl WeatherApp {
    /// Build the controller. Must be called inside a tokio runtime.
    pub fn new(
        config: Config,
        history: HistoryStore,
    ) -> Result<(Self, mpsc::UnboundedReceiver<AppEvent>)> {
        let client = WeatherClient::new(
            config.api_key().map(str::to_string),
            &config.openweather.api_base_url,
        )?;
        let cache = WeatherCache::new(Duration::from_millis(config.query.stale_time_ms));
        let retry = RetryConfig::with_max_retries(config.query.retry_count);
        let history = history.into_shared();
        let undo = UndoCoordinator::new(
            history.clone(),
            Duration::from_millis(config.undo.duration_ms),
        );
        let (events, rx) = mpsc::unbounded_channel();

        tracing::info!(
            "{} v{} ready ({} cities in history)",
            config.app.name,
            config.app.version,
            history.lock().len()
        );

        Ok((
            Self {
                config,
                client,
                cache,
                retry,
                history,
                undo,
                current_city: None,
                state: FetchState::Idle,
                events,
            },
            rx,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn current_city(&self) -> Option<&str> {
        self.current_city.as_deref()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().cities().to_vec()
    }

    pub fn undo_window(&self) -> &UndoCoordinator {
        &self.undo
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Look up `input` and record it in the history.
    ///
    /// Blank input changes nothing and returns `false`.
    pub async fn search(&mut self, input: &str) -> bool {
        let city = input.trim();
        if city.is_empty() {
            return false;
        }

        self.history.lock().add(city);
        self.load(city.to_string(), true).await;
        true
    }

    /// Look up the history entry at `index` and move it to the front.
    pub async fn select(&mut self, index: usize) -> bool {
        let Some(city) = self.history.lock().get(index).map(str::to_string) else {
            return false;
        };
        self.search(&city).await
    }

    /// Fetch the current city again, skipping the cache.
    pub async fn retry(&mut self) -> bool {
        let Some(city) = self.current_city.clone() else {
            return false;
        };
        self.load(city, false).await;
        true
    }

    /// Remove the history entry at `index` behind an undo window.
    pub fn delete(&mut self, index: usize) -> Option<PendingDeletion> {
        let city = self.history.lock().get(index)?.to_string();
        let events = self.events.clone();
        let closed = city.clone();
        self.undo.delete(&city, move || {
            let _ = events.send(AppEvent::UndoClosed(closed));
        })
    }

    pub fn undo(&mut self) -> Option<PendingDeletion> {
        self.undo.undo()
    }

    pub fn dismiss(&mut self) -> Option<PendingDeletion> {
        self.undo.dismiss()
    }

    /// Empty the history. An open undo window is dismissed first so it cannot
    /// bring an entry back afterwards.
    pub fn clear_history(&mut self) {
        self.undo.dismiss();
        self.history.lock().clear();
        tracing::info!("Search history cleared");
    }

    async fn load(&mut self, city: String, use_cache: bool) {
        self.current_city = Some(city.clone());

        if use_cache {
            if let Some(cached) = self.cache.fresh(&city) {
                tracing::debug!("Serving {:?} from cache", city);
                self.state = FetchState::Loaded(cached.clone());
                return;
            }
        } else {
            self.cache.invalidate(&city);
        }

        let client = &self.client;
        let result = with_retry(&self.retry, || client.current_weather(&city)).await;

        self.state = match result {
            Ok(weather) => {
                self.cache.prune();
                self.cache.insert(&city, weather.clone());
                FetchState::Loaded(weather)
            }
            Err(e) => {
                tracing::warn!("Lookup for {:?} failed: {}", city, e);
                FetchState::Failed(e.to_string())
            }
        };
    }
}
