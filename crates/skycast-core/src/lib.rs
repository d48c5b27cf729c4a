pub mod config;
pub mod error;

pub use config::{
    AppConfig, Config, DevConfig, OpenWeatherConfig, QueryConfig, StorageConfig, UndoConfig,
    ValidationResult, API_KEY_ENV,
};
pub use error::ConfigError;

/// Initialize tracing for the application.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Output goes to
/// stderr so it never interleaves with rendered weather on stdout.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("SkyCast tracing initialized");
}
