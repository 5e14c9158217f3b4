//! Weather service for wxdash
//!
//! Provides current conditions and a 5-day forecast from OpenWeatherMap behind
//! a cache/throttle gate, plus unit conversion and search-query parsing.

pub mod client;
pub mod error;
pub mod forecast;
pub mod query;
pub mod types;
pub mod units;

pub use client::{WeatherClient, WeatherClientConfig};
pub use error::{QueryError, WeatherError};
pub use forecast::{group_by_day, MAX_FORECAST_DAYS};
pub use query::parse;
pub use types::*;
pub use units::{to_display_speed, to_display_temperature};
pub use wxdash_core::Units;
