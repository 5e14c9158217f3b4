//! Dashboard session: the selected city, its weather, and the display units.
//!
//! Weather is always fetched in metric and converted when rendered, so a unit
//! toggle never reaches the network.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use wxdash_ai::{AiClient, AiClientConfig};
use wxdash_core::{AppError, Config, Units};
use wxdash_weather::units::{display_temperature_opt, fahrenheit_to_celsius, mph_to_mps};
use wxdash_weather::{
    parse, to_display_speed, to_display_temperature, CityQuery, CurrentWeatherReading,
    ForecastDay, WeatherClient, WeatherClientConfig,
};

use crate::favorites::FavoritesStore;
use crate::storage::{FileSlotStorage, SlotStorage};

/// Current weather and forecast rendered in the selected units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub city: String,
    pub units: Units,
    pub temperature: f64,
    pub temperature_symbol: &'static str,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub speed_symbol: &'static str,
    pub condition_text: String,
    pub fetched_at: DateTime<Utc>,
    pub forecast: Vec<ForecastView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    pub date: NaiveDate,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub condition_text: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug)]
struct Session {
    units: Units,
    city: Option<CityQuery>,
    reading: Option<CurrentWeatherReading>,
    forecast: Vec<ForecastDay>,
    last_answer: Option<String>,
}

pub struct Dashboard {
    weather: Arc<WeatherClient>,
    ai: Arc<AiClient>,
    favorites: FavoritesStore,
    session: Mutex<Session>,
}

impl Dashboard {
    pub fn new(
        weather: Arc<WeatherClient>,
        ai: Arc<AiClient>,
        favorites: FavoritesStore,
        units: Units,
    ) -> Self {
        Self {
            weather,
            ai,
            favorites,
            session: Mutex::new(Session {
                units,
                city: None,
                reading: None,
                forecast: Vec::new(),
                last_answer: None,
            }),
        }
    }

    /// Build clients and file-backed favorites from `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let weather = WeatherClient::new(WeatherClientConfig::from(&config.weather))?;
        let ai = AiClient::new(AiClientConfig::from(&config.ai))?;
        let storage: Arc<dyn SlotStorage> = Arc::new(FileSlotStorage::new(config.storage.dir.clone()));

        Ok(Self::new(
            Arc::new(weather),
            Arc::new(ai),
            FavoritesStore::load(storage),
            config.weather.default_units,
        ))
    }

    /// Parse `raw` and show that city.
    pub async fn search(&self, raw: &str) -> Result<WeatherView, AppError> {
        let query = parse(raw)?;
        self.show(query).await
    }

    /// Show the favorite at `index` (0 is the most recent).
    pub async fn select_favorite(&self, index: usize) -> Result<WeatherView, AppError> {
        let query = self
            .favorites
            .get(index)
            .ok_or(AppError::NoSuchFavorite(index))?;
        self.show(query).await
    }

    async fn show(&self, query: CityQuery) -> Result<WeatherView, AppError> {
        let reading = self.weather.current_weather(&query, Units::Metric).await?;

        let forecast = match self.weather.forecast(&query, Units::Metric).await {
            Ok(days) => days,
            Err(e) => {
                tracing::warn!("Forecast for {} unavailable: {}", query, e);
                Vec::new()
            }
        };

        if let Err(e) = self.favorites.add(query.clone()) {
            tracing::warn!("Failed to save favorites: {}", e);
        }

        let mut session = self.session.lock();
        let view = render_reading(&reading, &forecast, session.units);
        session.city = Some(query);
        session.reading = Some(reading);
        session.forecast = forecast;

        Ok(view)
    }

    pub fn toggle_units(&self) -> Units {
        let mut session = self.session.lock();
        session.units = session.units.toggled();
        tracing::debug!("Display units now {}", session.units);
        session.units
    }

    pub fn set_units(&self, units: Units) {
        self.session.lock().units = units;
    }

    pub fn units(&self) -> Units {
        self.session.lock().units
    }

    pub fn selected_city(&self) -> Option<CityQuery> {
        self.session.lock().city.clone()
    }

    /// The current view, or `None` before the first successful search.
    pub fn view(&self) -> Option<WeatherView> {
        render(&self.session.lock())
    }

    pub async fn ask(&self, prompt: &str) -> Result<String, AppError> {
        let answer = self.ai.ask(prompt).await?;
        self.session.lock().last_answer = Some(answer.clone());
        Ok(answer)
    }

    pub fn last_answer(&self) -> Option<String> {
        self.session.lock().last_answer.clone()
    }

    pub fn favorites(&self) -> Vec<CityQuery> {
        self.favorites.list()
    }

    pub fn clear_favorites(&self) -> Result<(), AppError> {
        Ok(self.favorites.clear()?)
    }
}

fn render(session: &Session) -> Option<WeatherView> {
    let reading = session.reading.as_ref()?;
    Some(render_reading(reading, &session.forecast, session.units))
}

fn render_reading(
    reading: &CurrentWeatherReading,
    forecast: &[ForecastDay],
    units: Units,
) -> WeatherView {
    let (celsius, mps) = match reading.units {
        Units::Metric => (reading.temperature, reading.wind_speed),
        Units::Imperial => (
            fahrenheit_to_celsius(reading.temperature),
            mph_to_mps(reading.wind_speed),
        ),
    };

    let city = if reading.country_code.is_empty() {
        reading.city.clone()
    } else {
        format!("{}, {}", reading.city, reading.country_code)
    };

    WeatherView {
        city,
        units,
        temperature: to_display_temperature(celsius, units),
        temperature_symbol: units.temperature_symbol(),
        humidity_pct: reading.humidity_pct,
        wind_speed: to_display_speed(mps, units),
        speed_symbol: units.speed_symbol(),
        condition_text: reading.condition_text.clone(),
        fetched_at: reading.fetched_at,
        forecast: forecast
            .iter()
            .map(|day| ForecastView {
                date: day.date,
                min_temp: display_temperature_opt(day.min_temp, units),
                max_temp: display_temperature_opt(day.max_temp, units),
                condition_text: day.condition_text.clone(),
                icon_url: day.icon_url(),
            })
            .collect(),
    }
}
