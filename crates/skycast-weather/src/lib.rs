//! Weather service for SkyCast
//!
//! Fetches current conditions from the OpenWeatherMap API, with a retry
//! policy and a short-lived result cache wrapped around the fetch.

pub mod cache;
pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use cache::WeatherCache;
pub use client::{WeatherClient, DEFAULT_BASE_URL};
pub use error::WeatherError;
pub use retry::{with_retry, RetryConfig};
pub use types::*;
