//! Weather fetch errors.
//!
//! The `Display` text of every variant is the message shown to the user.

use reqwest::StatusCode;
use skycast_core::API_KEY_ENV;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("OpenWeatherMap API key is not configured. Please set {} in your environment variables.", API_KEY_ENV)]
    MissingApiKey,

    #[error("City \"{0}\" not found. Please check the city name and try again.")]
    CityNotFound(String),

    #[error("Invalid API key. Please check your OpenWeatherMap API key.")]
    InvalidApiKey,

    #[error("Weather API error: {}", format_status(.status, .status_text))]
    Api { status: u16, status_text: String },

    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Network(reqwest::Error),

    #[error("Failed to fetch weather data. Please check your internet connection and try again.")]
    Unreachable,
}

/// `<code> <reason>`, or just the code when there is no reason phrase.
fn format_status(status: &u16, status_text: &str) -> String {
    let text = status_text.trim();
    if text.is_empty() {
        status.to_string()
    } else {
        format!("{} {}", status, text)
    }
}

impl WeatherError {
    /// Map a non-success status to the matching error.
    pub fn from_status(status: StatusCode, city: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::CityNotFound(city.to_string()),
            StatusCode::UNAUTHORIZED => Self::InvalidApiKey,
            other => Self::Api {
                status: other.as_u16(),
                status_text: other.canonical_reason().unwrap_or_default().to_string(),
            },
        }
    }

    /// Wrap a transport failure, keeping its message when it has one.
    ///
    /// The request URL is stripped first since its query carries the API key.
    pub fn from_transport(error: reqwest::Error) -> Self {
        let error = error.without_url();
        if error.to_string().trim().is_empty() {
            Self::Unreachable
        } else {
            Self::Network(error)
        }
    }

    /// Whether a retry policy should try the request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Unreachable => true,
            Self::Api { status, .. } => {
                *status >= 500
                    || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || *status == StatusCode::REQUEST_TIMEOUT.as_u16()
            }
            Self::MissingApiKey | Self::CityNotFound(_) | Self::InvalidApiKey | Self::Parse(_) => {
                false
            }
        }
    }
}
