//! OpenWeatherMap client for current conditions and the 5-day forecast.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::instrument;
use wxdash_core::{
    Clock, GateConfig, RequestGate, SystemClock, ThrottleScope, Units, WeatherConfig,
};

use crate::error::WeatherError;
use crate::forecast::group_by_day;
use crate::types::{
    ApiCurrentResponse, ApiForecastResponse, CityQuery, CurrentWeatherReading, ForecastDay,
};

const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_THROTTLE: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WeatherClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub cache_ttl: Duration,
    pub throttle: Duration,
    pub timeout: Duration,
}

impl WeatherClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENWEATHER_API_BASE.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            throttle: DEFAULT_THROTTLE,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl From<&WeatherConfig> for WeatherClientConfig {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            cache_ttl: config.cache_ttl(),
            throttle: config.throttle(),
            timeout: config.timeout(),
        }
    }
}

/// Weather provider client. Current weather and forecast each sit behind
/// their own gate, keyed by `city-country-unit`.
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    clock: Arc<dyn Clock>,
    current: RequestGate<CurrentWeatherReading, WeatherError>,
    forecast: RequestGate<Vec<ForecastDay>, WeatherError>,
}

impl WeatherClient {
    pub fn new(config: WeatherClientConfig) -> Result<Self, WeatherError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: WeatherClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let gate_config =
            GateConfig::new(Some(config.cache_ttl), config.throttle, ThrottleScope::PerKey);

        Ok(Self {
            client,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            current: RequestGate::new("current_weather", gate_config.clone(), clock.clone()),
            forecast: RequestGate::new("forecast", gate_config, clock.clone()),
            clock,
        })
    }

    /// Current conditions for `query`.
    #[instrument(skip(self), level = "info")]
    pub async fn current_weather(
        &self,
        query: &CityQuery,
        units: Units,
    ) -> Result<CurrentWeatherReading, WeatherError> {
        let key = query.cache_key(units);
        let request = self.request("weather", query, units);
        let clock = self.clock.clone();

        self.current
            .run(&key, move || async move {
                let api: ApiCurrentResponse = request.send().await?;
                Ok::<_, WeatherError>(CurrentWeatherReading::from_api(api, units, clock.now()))
            })
            .await
    }

    /// Up to five days of forecast for `query`, grouped by date.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast(
        &self,
        query: &CityQuery,
        units: Units,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let key = query.cache_key(units);
        let request = self.request("forecast", query, units);

        self.forecast
            .run(&key, move || async move {
                let api: ApiForecastResponse = request.send().await?;
                Ok::<_, WeatherError>(group_by_day(&api.list))
            })
            .await
    }

    fn request(&self, endpoint: &str, query: &CityQuery, units: Units) -> ProviderRequest {
        ProviderRequest {
            client: self.client.clone(),
            url: format!("{}/{}", self.base_url, endpoint),
            params: vec![
                ("q", query.api_query()),
                ("units", units.as_str().to_string()),
                ("appid", self.api_key.clone()),
            ],
            city: query.to_string(),
        }
    }
}

/// An owned, ready-to-send GET so the gate can run it as a `'static` future.
struct ProviderRequest {
    client: Client,
    url: String,
    params: Vec<(&'static str, String)>,
    city: String,
}

impl ProviderRequest {
    async fn send<T: DeserializeOwned>(self) -> Result<T, WeatherError> {
        tracing::info!("Requesting {} for {}", self.url, self.city);

        let response = self.client.get(&self.url).query(&self.params).send().await?;
        handle_response(response, &self.city).await
    }
}

/// Map provider status codes: 404 → city not found, 401 → bad key,
/// anything else that isn't a success → network error.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    city: &str,
) -> Result<T, WeatherError> {
    let status = response.status();

    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| WeatherError::Network(format!("Invalid response: {}", e.without_url())))
    } else if status == StatusCode::NOT_FOUND {
        Err(WeatherError::CityNotFound(city.to_string()))
    } else if status == StatusCode::UNAUTHORIZED {
        Err(WeatherError::InvalidCredentials)
    } else {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!("Weather provider returned {}: {}", status, text);
        Err(WeatherError::Network(format!("{}: {}", status, text)))
    }
}
