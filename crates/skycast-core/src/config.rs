use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const APP_DIR: &str = "skycast";
const CONFIG_FILE: &str = "config.toml";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openweather: OpenWeatherConfig,

    #[serde(default)]
    pub app: AppConfig,

    /// Fetch policy (retries, result staleness)
    #[serde(default)]
    pub query: QueryConfig,

    /// Search history persistence
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub undo: UndoConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    /// API key. No default: a missing key fails every fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Weather App".to_string(),
            description: "Get current weather information for any city".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Retries applied around a failed fetch
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// How long a fetched result is served without refetching
    #[serde(default = "default_stale_time_ms")]
    pub stale_time_ms: u64,
}

fn default_retry_count() -> u32 {
    1
}

fn default_stale_time_ms() -> u64 {
    300_000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            stale_time_ms: default_stale_time_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the history list is stored under
    #[serde(default = "default_storage_key")]
    pub key: String,

    #[serde(default = "default_max_history_items")]
    pub max_history_items: usize,

    /// Storage directory; platform config dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_storage_key() -> String {
    "weather_search_history".to_string()
}

fn default_max_history_items() -> usize {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            max_history_items: default_max_history_items(),
            dir: None,
        }
    }
}

impl StorageConfig {
    /// Directory the history file lives in.
    pub fn effective_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| default_app_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoConfig {
    /// How long a removed history entry can be restored
    #[serde(default = "default_undo_duration_ms")]
    pub duration_ms: u64,
}

fn default_undo_duration_ms() -> u64 {
    5000
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_undo_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default)]
    pub mode: bool,

    #[serde(default = "default_enable_devtools")]
    pub enable_devtools: bool,
}

fn default_enable_devtools() -> bool {
    true
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            mode: false,
            enable_devtools: default_enable_devtools(),
        }
    }
}

fn default_app_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

/// Parse a numeric override, keeping `current` when unset, empty or malformed.
fn env_number<T: std::str::FromStr>(value: Option<String>, current: T) -> T {
    match value {
        Some(v) if !v.is_empty() => v.trim().parse().unwrap_or(current),
        _ => current,
    }
}

/// Booleans are only true for the literal `"true"`.
fn env_bool(value: Option<String>, current: bool) -> bool {
    match value {
        Some(v) if !v.is_empty() => v == "true",
        _ => current,
    }
}

fn env_string(value: Option<String>, current: &mut String) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        *current = v;
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file, then environment overrides.
    ///
    /// With no explicit path the default location is used and created with
    /// defaults when it doesn't exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    let config = Self::default();
                    if let Err(e) = config.save(&path) {
                        tracing::warn!("Could not write default config: {}", e);
                    }
                    config
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration and validate it.
    ///
    /// Fails on validation errors. Warnings are returned for the caller to
    /// log once tracing is up.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        Ok((config, validation))
    }

    /// Read a TOML config file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Ok(toml::from_str(&contents)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to resolve variables.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.openweather.api_key = Some(key);
        }
        env_string(
            lookup("OPENWEATHER_API_BASE_URL"),
            &mut self.openweather.api_base_url,
        );

        env_string(lookup("SKYCAST_APP_NAME"), &mut self.app.name);
        env_string(lookup("SKYCAST_APP_DESCRIPTION"), &mut self.app.description);
        env_string(lookup("SKYCAST_APP_VERSION"), &mut self.app.version);

        self.query.retry_count =
            env_number(lookup("SKYCAST_QUERY_RETRY_COUNT"), self.query.retry_count);
        self.query.stale_time_ms =
            env_number(lookup("SKYCAST_QUERY_STALE_TIME"), self.query.stale_time_ms);

        env_string(lookup("SKYCAST_STORAGE_KEY"), &mut self.storage.key);
        self.storage.max_history_items = env_number(
            lookup("SKYCAST_MAX_HISTORY_ITEMS"),
            self.storage.max_history_items,
        );
        if let Some(dir) = lookup("SKYCAST_STORAGE_DIR").filter(|d| !d.is_empty()) {
            self.storage.dir = Some(PathBuf::from(dir));
        }

        self.undo.duration_ms = env_number(lookup("SKYCAST_UNDO_DURATION_MS"), self.undo.duration_ms);

        self.dev.mode = env_bool(lookup("SKYCAST_DEV_MODE"), self.dev.mode);
        self.dev.enable_devtools =
            env_bool(lookup("SKYCAST_ENABLE_DEVTOOLS"), self.dev.enable_devtools);
    }

    /// API key if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.openweather.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn is_development(&self) -> bool {
        self.dev.mode
    }

    /// Devtools only apply in development mode.
    pub fn devtools_enabled(&self) -> bool {
        self.dev.enable_devtools && self.is_development()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.openweather.api_base_url,
            "openweather.api_base_url",
            &mut result,
        );

        if self.api_key().is_none() {
            result.add_warning(
                "openweather.api_key",
                format!("API key not configured - set {} to fetch weather", API_KEY_ENV),
            );
        }

        if self.storage.max_history_items == 0 {
            result.add_error(
                "storage.max_history_items",
                "History size must be greater than 0",
            );
        }

        if self.storage.key.trim().is_empty() {
            result.add_error("storage.key", "Storage key must not be empty");
        }

        if self.query.retry_count > 10 {
            result.add_warning(
                "query.retry_count",
                "Retry count is unusually large (>10)",
            );
        }

        if self.query.stale_time_ms == 0 {
            result.add_warning("query.stale_time_ms", "Result caching disabled (0 ms)");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Default location of the configuration file
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        default_app_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.openweather.api_key, None);
        assert_eq!(
            config.openweather.api_base_url,
            "https://api.openweathermap.org/data/2.5"
        );
        assert_eq!(config.app.name, "Weather App");
        assert_eq!(config.query.retry_count, 1);
        assert_eq!(config.query.stale_time_ms, 300_000);
        assert_eq!(config.storage.key, "weather_search_history");
        assert_eq!(config.storage.max_history_items, 10);
        assert_eq!(config.undo.duration_ms, 5000);
        assert!(!config.dev.mode);
        assert!(config.dev.enable_devtools);
    }

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.iter().any(|w| w.field == "openweather.api_key"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_from(lookup_from(&[
            ("OPENWEATHER_API_KEY", "abc123"),
            ("OPENWEATHER_API_BASE_URL", "http://localhost:9000"),
            ("SKYCAST_MAX_HISTORY_ITEMS", "3"),
            ("SKYCAST_QUERY_RETRY_COUNT", "2"),
            ("SKYCAST_STORAGE_KEY", "custom_key"),
            ("SKYCAST_DEV_MODE", "true"),
        ]));

        assert_eq!(config.api_key(), Some("abc123"));
        assert_eq!(config.openweather.api_base_url, "http://localhost:9000");
        assert_eq!(config.storage.max_history_items, 3);
        assert_eq!(config.query.retry_count, 2);
        assert_eq!(config.storage.key, "custom_key");
        assert!(config.is_development());
        assert!(config.devtools_enabled());
    }

    #[test]
    fn test_env_malformed_number_keeps_default() {
        let mut config = Config::default();
        config.apply_env_from(lookup_from(&[("SKYCAST_MAX_HISTORY_ITEMS", "lots")]));
        assert_eq!(config.storage.max_history_items, 10);
    }

    #[test]
    fn test_env_bool_only_literal_true() {
        let mut config = Config::default();
        config.apply_env_from(lookup_from(&[
            ("SKYCAST_DEV_MODE", "yes"),
            ("SKYCAST_ENABLE_DEVTOOLS", "1"),
        ]));
        assert!(!config.dev.mode);
        assert!(!config.dev.enable_devtools);
    }

    #[test]
    fn test_empty_api_key_is_missing() {
        let mut config = Config::default();
        config.apply_env_from(lookup_from(&[("OPENWEATHER_API_KEY", "")]));
        assert_eq!(config.api_key(), None);

        config.openweather.api_key = Some(String::new());
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_devtools_require_dev_mode() {
        let config = Config::default();
        assert!(config.dev.enable_devtools);
        assert!(!config.devtools_enabled());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.openweather.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "openweather.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.openweather.api_base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_history_size() {
        let mut config = Config::default();
        config.storage.max_history_items = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "storage.max_history_items"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.storage.max_history_items = 4;
        config.app.name = "Test Weather".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.storage.max_history_items, 4);
        assert_eq!(loaded.app.name, "Test Weather");
        assert_eq!(loaded.openweather.api_key, None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\nmax_history_items = 5\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.storage.max_history_items, 5);
        assert_eq!(loaded.storage.key, "weather_search_history");
        assert_eq!(loaded.query.retry_count, 1);
    }

    #[test]
    fn test_partial_app_section_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[app]\nname = \"My Weather\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.app.name, "My Weather");
        assert_eq!(
            loaded.app.description,
            "Get current weather information for any city"
        );
        assert_eq!(loaded.app.version, "1.0.0");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[openweather]\napi_base_url = \"ftp://example.com\"\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        match err {
            ConfigError::Invalid(summary) => assert!(summary.contains("openweather.api_base_url")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
