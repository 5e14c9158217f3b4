//! Centralized error types for the wxdash application.
//!
//! Feature crates keep their own precise errors and convert into
//! [`AppError`] at the edge. Use `user_message()` for anything shown to the
//! user.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid search: {0}")]
    EmptyQuery(String),

    #[error("Request throttled")]
    Throttled,

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid API credentials")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No favorite at position {0}")]
    NoSuchFavorite(usize),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a short message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::EmptyQuery(_) => "Please enter a city name.",
            AppError::Throttled => "Please wait a moment before trying again.",
            AppError::CityNotFound(_) => "City not found",
            AppError::InvalidCredentials => "Invalid API key",
            AppError::Network(_) => "Network error",
            AppError::AiUnavailable(_) => "Error: Unable to get AI response.",
            AppError::Storage(_) => "Could not save your favorites.",
            AppError::NoSuchFavorite(_) => "No favorite at that position.",
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Problems with `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Parse { .. } => "config.toml could not be read. Fix or delete it.",
            ConfigError::Invalid(_) => "Invalid configuration. Check config.toml.",
        }
    }
}
