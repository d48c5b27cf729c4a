//! In-memory cache of recent fetch results.
//!
//! A result younger than the staleness window is served without a new
//! request. Snapshots are never written to disk.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::CurrentWeather;

#[derive(Debug, Clone)]
struct CachedWeather {
    data: CurrentWeather,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct WeatherCache {
    entries: HashMap<String, CachedWeather>,
    stale_after: Duration,
}

impl WeatherCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Cached result for `city` if still fresh. Keys are exact city strings.
    pub fn fresh(&self, city: &str) -> Option<&CurrentWeather> {
        self.fresh_at(city, Instant::now())
    }

    pub fn fresh_at(&self, city: &str, now: Instant) -> Option<&CurrentWeather> {
        let entry = self.entries.get(city)?;
        let age = now.saturating_duration_since(entry.fetched_at);
        (age < self.stale_after).then_some(&entry.data)
    }

    pub fn insert(&mut self, city: &str, data: CurrentWeather) {
        self.insert_at(city, data, Instant::now());
    }

    pub fn insert_at(&mut self, city: &str, data: CurrentWeather, fetched_at: Instant) {
        self.entries
            .insert(city.to_string(), CachedWeather { data, fetched_at });
    }

    pub fn invalidate(&mut self, city: &str) {
        self.entries.remove(city);
    }

    /// Drop every entry that is no longer fresh
    pub fn prune(&mut self) {
        let now = Instant::now();
        let stale_after = self.stale_after;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < stale_after);
    }

    /// Cached cities with their age, newest first
    pub fn entries(&self) -> Vec<(String, Duration)> {
        let now = Instant::now();
        let mut out: Vec<(String, Duration)> = self
            .entries
            .iter()
            .map(|(city, entry)| (city.clone(), now.saturating_duration_since(entry.fetched_at)))
            .collect();
        out.sort_by_key(|(_, age)| *age);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
