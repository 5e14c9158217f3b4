use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use wxdash_core::Units;

const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";

/// A city to look up, as typed by the user ("Paris, FR").
///
/// Equality is the exact `(name, country)` pair; "paris" and "Paris" differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityQuery {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl CityQuery {
    pub fn new(name: impl Into<String>, country: Option<String>) -> Self {
        Self {
            name: name.into(),
            country,
        }
    }

    /// Value for the provider's `q` parameter: `name` or `name,country`.
    pub fn api_query(&self) -> String {
        match &self.country {
            Some(country) => format!("{},{}", self.name, country),
            None => self.name.clone(),
        }
    }

    /// Gate key: `city-country-unit`, with an empty country segment when absent.
    pub fn cache_key(&self, units: Units) -> String {
        format!(
            "{}-{}-{}",
            self.name,
            self.country.as_deref().unwrap_or(""),
            units.as_str()
        )
    }
}

impl std::fmt::Display for CityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}, {}", self.name, country),
            None => f.write_str(&self.name),
        }
    }
}

/// Current conditions for a city, in the units it was requested in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeatherReading {
    pub city: String,
    pub country_code: String,
    pub temperature: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub condition_text: String,
    pub units: Units,
    pub fetched_at: DateTime<Utc>,
}

impl CurrentWeatherReading {
    pub fn from_api(api: ApiCurrentResponse, units: Units, fetched_at: DateTime<Utc>) -> Self {
        Self {
            city: api.name,
            country_code: api.sys.country.unwrap_or_default(),
            temperature: api.main.temp,
            humidity_pct: api.main.humidity,
            wind_speed: api.wind.speed,
            condition_text: api
                .weather
                .into_iter()
                .next()
                .map(|w| w.description)
                .unwrap_or_default(),
            units,
            fetched_at,
        }
    }
}

/// One forecast day folded from the provider's 3-hour samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub condition_text: Option<String>,
    pub icon_id: Option<String>,
}

impl ForecastDay {
    pub fn icon_url(&self) -> Option<String> {
        self.icon_id.as_deref().map(icon_url)
    }
}

/// Image URL for a provider icon id such as `10d`.
pub fn icon_url(icon_id: &str) -> String {
    format!("{}/{}@2x.png", ICON_URL_BASE, icon_id)
}

// API Response Types

/// `GET /weather` response.
#[derive(Debug, Deserialize)]
pub struct ApiCurrentResponse {
    pub name: String,
    #[serde(default)]
    pub sys: ApiSys,
    pub main: ApiMain,
    #[serde(default)]
    pub wind: ApiWind,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSys {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMain {
    pub temp: f64,
    pub humidity: u8,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiWind {
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCondition {
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
}

/// `GET /forecast` response.
#[derive(Debug, Deserialize)]
pub struct ApiForecastResponse {
    #[serde(default)]
    pub list: Vec<ApiForecastSample>,
}

/// A single forecast sample. 3-hour samples carry `main.temp_min/temp_max`;
/// daily samples carry `temp.{min,max,day}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiForecastSample {
    pub dt: i64,
    pub main: Option<ApiSampleMain>,
    pub temp: Option<ApiDailyTemp>,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSampleMain {
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDailyTemp {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub day: Option<f64>,
}

impl ApiForecastSample {
    /// `(min, max)` for this sample, falling back to the daily mean.
    pub fn min_max(&self) -> (Option<f64>, Option<f64>) {
        if let Some(main) = &self.main {
            return (main.temp_min, main.temp_max);
        }
        match &self.temp {
            Some(t) => (t.min.or(t.day), t.max.or(t.day)),
            None => (None, None),
        }
    }

    pub fn condition(&self) -> Option<&ApiCondition> {
        self.weather.first()
    }
}
