//! Bounded, ordered, case-insensitively de-duplicated city history.
//!
//! Most recent entries come first. Every mutation is persisted through a
//! [`KeyValueStorage`] as a JSON array of strings. Persistence is best effort:
//! read failures and corrupt data load as an empty history, write failures are
//! logged and otherwise ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::storage::KeyValueStorage;

/// History handle shared between the controller and the undo coordinator.
pub type SharedHistory = Arc<Mutex<HistoryStore>>;

/// What was found under the storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Vec<String>),
    Absent,
    /// Unreadable, unparseable, or not an array of strings
    Corrupt(String),
}

impl LoadOutcome {
    /// Collapse to a list; absent and corrupt both mean "no history".
    pub fn into_cities(self) -> Vec<String> {
        match self {
            LoadOutcome::Loaded(cities) => cities,
            LoadOutcome::Absent | LoadOutcome::Corrupt(_) => Vec::new(),
        }
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub struct HistoryStore {
    storage: Box<dyn KeyValueStorage>,
    key: String,
    max_items: usize,
    cities: Vec<String>,
    last_updated: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("key", &self.key)
            .field("max_items", &self.max_items)
            .field("cities", &self.cities)
            .finish()
    }
}

impl HistoryStore {
    /// Open the store and load whatever history is persisted under `key`.
    pub fn open(
        storage: impl KeyValueStorage + 'static,
        key: impl Into<String>,
        max_items: usize,
    ) -> Self {
        let mut store = Self {
            storage: Box::new(storage),
            key: key.into(),
            max_items,
            cities: Vec::new(),
            last_updated: None,
        };
        store.load();
        store
    }

    pub fn into_shared(self) -> SharedHistory {
        Arc::new(Mutex::new(self))
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.cities.get(index).map(String::as_str)
    }

    /// Index of the entry exactly equal to `city`.
    pub fn position(&self, city: &str) -> Option<usize> {
        self.cities.iter().position(|c| c == city)
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Time of the last change to the list, including loads.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }

    /// Read the raw persisted state without touching the in-memory list.
    pub fn read_persisted(&self) -> LoadOutcome {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::Absent,
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => {
                let cities: Option<Vec<String>> = items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                match cities {
                    Some(cities) => LoadOutcome::Loaded(cities),
                    None => LoadOutcome::Corrupt("array contains non-string entries".into()),
                }
            }
            Ok(_) => LoadOutcome::Corrupt("persisted value is not an array".into()),
            Err(e) => LoadOutcome::Corrupt(e.to_string()),
        }
    }

    /// Replace the in-memory list with the persisted one.
    ///
    /// Never fails: anything other than a JSON array of strings loads as
    /// empty. The result is capped at the configured maximum.
    pub fn load(&mut self) -> &[String] {
        let outcome = self.read_persisted();
        if let LoadOutcome::Corrupt(reason) = &outcome {
            tracing::warn!(
                "Ignoring unreadable search history under {:?}: {}",
                self.key,
                reason
            );
        }

        let mut cities = outcome.into_cities();
        cities.truncate(self.max_items);
        tracing::debug!("Loaded {} history entries", cities.len());

        self.cities = cities;
        self.touch();
        &self.cities
    }

    /// Persist `cities`, dropping blank entries and trimming the rest.
    ///
    /// Failures are logged, never returned.
    pub fn save(&self, cities: &[String]) {
        let valid: Vec<&str> = cities
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        let json = match serde_json::to_string(&valid) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize search history: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.set(&self.key, &json) {
            tracing::error!("Failed to save search history: {}", e);
        }
    }

    fn persist(&self) {
        self.save(&self.cities);
    }

    /// Put `city` first, replacing any case-insensitive duplicate.
    ///
    /// Blank input is ignored. The given casing is kept.
    pub fn add(&mut self, city: &str) -> &[String] {
        let trimmed = city.trim();
        if trimmed.is_empty() {
            return &self.cities;
        }

        self.cities.retain(|c| !same_city(c, trimmed));
        self.cities.insert(0, trimmed.to_string());
        self.cities.truncate(self.max_items);
        self.touch();
        self.persist();

        &self.cities
    }

    /// Remove the entry exactly equal to the trimmed `city`.
    ///
    /// Nothing is written when the input is blank or not present.
    pub fn remove(&mut self, city: &str) -> &[String] {
        let trimmed = city.trim();
        if trimmed.is_empty() {
            return &self.cities;
        }

        let Some(index) = self.position(trimmed) else {
            return &self.cities;
        };

        self.cities.remove(index);
        self.touch();
        self.persist();

        &self.cities
    }

    /// Insert `city` at `index`, appending when `index` is past the end.
    ///
    /// Any case-insensitive duplicate already in the list is dropped first so
    /// the list stays unique.
    pub fn reinsert_at(&mut self, city: &str, index: usize) -> &[String] {
        let trimmed = city.trim();
        if trimmed.is_empty() {
            return &self.cities;
        }

        self.cities.retain(|c| !same_city(c, trimmed));
        let index = index.min(self.cities.len());
        self.cities.insert(index, trimmed.to_string());
        self.cities.truncate(self.max_items);
        self.touch();
        self.persist();

        &self.cities
    }

    pub fn clear(&mut self) {
        self.cities.clear();
        self.touch();
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const KEY: &str = "weather_search_history";

    fn store_with(storage: &MemoryStorage, max: usize) -> HistoryStore {
        HistoryStore::open(storage.clone(), KEY, max)
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_end_to_end_example() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage, 10);

        assert_eq!(store.add("  London  "), list(&["London"]).as_slice());
        assert_eq!(store.add("PARIS"), list(&["PARIS", "London"]).as_slice());
        assert_eq!(store.add("london"), list(&["london", "PARIS"]).as_slice());
        assert_eq!(store.remove("PARIS"), list(&["london"]).as_slice());

        assert_eq!(storage.raw(KEY).as_deref(), Some("[\"london\"]"));
    }

    #[test]
    fn test_add_distinct_cities_newest_first() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        store.add("Oslo");
        store.add("Lima");
        assert_eq!(store.cities(), list(&["Lima", "Oslo"]).as_slice());
    }

    #[test]
    fn test_add_existing_moves_to_front_without_growing() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        store.add("Oslo");
        store.add("Lima");
        store.add("Cairo");

        store.add("OSLO");
        assert_eq!(store.cities(), list(&["OSLO", "Cairo", "Lima"]).as_slice());
    }

    #[test]
    fn test_add_blank_is_noop() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage, 10);
        store.add("   ");
        store.add("");
        assert!(store.is_empty());
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_add_truncates_oldest_first() {
        let mut store = store_with(&MemoryStorage::new(), 3);
        for city in ["A", "B", "C", "D", "E"] {
            store.add(city);
        }
        assert_eq!(store.cities(), list(&["E", "D", "C"]).as_slice());
    }

    #[test]
    fn test_remove_missing_writes_nothing() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage, 10);
        store.add("Oslo");
        let writes = storage.write_count();

        assert_eq!(store.remove("Lima"), list(&["Oslo"]).as_slice());
        assert_eq!(store.remove("  "), list(&["Oslo"]).as_slice());
        assert_eq!(storage.write_count(), writes);
    }

    #[test]
    fn test_remove_is_case_sensitive() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        store.add("Oslo");
        store.remove("oslo");
        assert_eq!(store.cities(), list(&["Oslo"]).as_slice());

        store.remove(" Oslo ");
        assert!(store.is_empty());
    }

    #[test]
    fn test_reinsert_at_index() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        for city in ["C", "B", "A"] {
            store.add(city);
        }
        store.remove("B");
        assert_eq!(store.reinsert_at("B", 1), list(&["A", "B", "C"]).as_slice());
    }

    #[test]
    fn test_reinsert_past_end_appends() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        store.add("A");
        assert_eq!(store.reinsert_at("Z", 7), list(&["A", "Z"]).as_slice());
        assert_eq!(store.reinsert_at("Y", 2), list(&["A", "Z", "Y"]).as_slice());
    }

    #[test]
    fn test_reinsert_respects_max() {
        let mut store = store_with(&MemoryStorage::new(), 2);
        store.add("B");
        store.add("A");
        assert_eq!(store.reinsert_at("X", 0), list(&["X", "A"]).as_slice());
    }

    #[test]
    fn test_reinsert_replaces_duplicate() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        store.add("B");
        store.add("A");
        assert_eq!(store.reinsert_at("b", 0), list(&["b", "A"]).as_slice());
    }

    #[test]
    fn test_clear_persists_empty_list() {
        let storage = MemoryStorage::new();
        let mut store = store_with(&storage, 10);
        store.add("Oslo");
        store.clear();

        assert!(store.is_empty());
        assert_eq!(storage.raw(KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_order_survives_reload() {
        let storage = MemoryStorage::new();
        {
            let mut store = store_with(&storage, 10);
            store.add("Oslo");
            store.add("Lima");
            store.add("Cairo");
        }
        let store = store_with(&storage, 10);
        assert_eq!(store.cities(), list(&["Cairo", "Lima", "Oslo"]).as_slice());
    }

    #[test]
    fn test_load_not_json_is_empty() {
        let storage = MemoryStorage::with_value(KEY, "not json");
        let store = store_with(&storage, 10);
        assert!(store.is_empty());
        assert!(matches!(store.read_persisted(), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn test_load_object_is_empty() {
        let storage = MemoryStorage::with_value(KEY, "{\"a\":1}");
        let store = store_with(&storage, 10);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_mixed_array_is_empty() {
        let storage = MemoryStorage::with_value(KEY, "[\"Oslo\", 3]");
        let store = store_with(&storage, 10);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_absent() {
        let store = store_with(&MemoryStorage::new(), 10);
        assert_eq!(store.read_persisted(), LoadOutcome::Absent);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_read_failure_is_empty() {
        let storage = MemoryStorage::with_value(KEY, "[\"Oslo\"]");
        storage.set_fail_reads(true);
        let store = store_with(&storage, 10);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_caps_at_max() {
        let storage = MemoryStorage::with_value(KEY, "[\"A\",\"B\",\"C\"]");
        let store = store_with(&storage, 2);
        assert_eq!(store.cities(), list(&["A", "B"]).as_slice());
    }

    #[test]
    fn test_save_filters_and_trims() {
        let storage = MemoryStorage::new();
        let store = store_with(&storage, 10);
        store.save(&list(&[" Oslo ", "", "   ", "Lima"]));
        assert_eq!(storage.raw(KEY).as_deref(), Some("[\"Oslo\",\"Lima\"]"));
    }

    #[test]
    fn test_write_failure_keeps_in_memory_state() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let mut store = store_with(&storage, 10);

        assert_eq!(store.add("Oslo"), list(&["Oslo"]).as_slice());
        assert_eq!(storage.raw(KEY), None);
    }

    #[test]
    fn test_last_updated_moves_on_mutation() {
        let mut store = store_with(&MemoryStorage::new(), 10);
        let loaded_at = store.last_updated();
        assert!(loaded_at.is_some());
        store.add("Oslo");
        assert!(store.last_updated() >= loaded_at);
    }
}
