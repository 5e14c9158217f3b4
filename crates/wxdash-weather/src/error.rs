//! Weather-specific error types.

use thiserror::Error;
use wxdash_core::{AppError, ThrottledError};

/// Search input could not be turned into a city query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Search query is empty")]
    EmptyQuery,
}

/// Errors from the weather provider and its request gate.
///
/// `Clone` so one in-flight result can be handed to every waiting caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    #[error("Request throttled, try again shortly")]
    Throttled,

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid API key")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    Network(String),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Throttled => "Please wait a moment before searching again.",
            Self::CityNotFound(_) => "City not found",
            Self::InvalidCredentials => "Invalid API key",
            Self::Network(_) => "Network error",
        }
    }
}

impl ThrottledError for WeatherError {
    fn throttled() -> Self {
        Self::Throttled
    }
}

/// The request URL carries `appid`, so it is stripped before the error is
/// turned into text.
impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url().to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::EmptyQuery(e.to_string())
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Throttled => AppError::Throttled,
            WeatherError::CityNotFound(city) => AppError::CityNotFound(city),
            WeatherError::InvalidCredentials => AppError::InvalidCredentials,
            WeatherError::Network(msg) => AppError::Network(msg),
        }
    }
}
