//! OpenWeatherMap current-weather client.

use std::time::Duration;

use reqwest::Client;
use tracing::instrument;

use crate::error::WeatherError;
use crate::types::CurrentWeather;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const UNITS: &str = "metric";

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherClient {
    /// Create a client. A missing key is accepted here and reported on fetch.
    pub fn new(api_key: Option<String>, base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(WeatherError::from_transport)?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_url(&self, city: &str, api_key: &str) -> String {
        format!(
            "{}/weather?q={}&appid={}&units={}",
            self.base_url,
            urlencoding::encode(city),
            api_key,
            UNITS,
        )
    }

    /// Fetch current weather for `city`.
    ///
    /// The city is sent as given; callers trim it if they want to.
    #[instrument(skip(self), level = "info")]
    pub async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = self.request_url(city, api_key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(WeatherError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Weather API returned {} for {:?}", status, city);
            return Err(WeatherError::from_status(status, city));
        }

        let body = response.text().await.map_err(WeatherError::from_transport)?;
        let weather: CurrentWeather = serde_json::from_str(&body)?;

        tracing::debug!("Fetched weather for {}", weather.name);
        Ok(weather)
    }
}
