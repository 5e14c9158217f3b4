//! AI-specific error types.

use thiserror::Error;
use wxdash_core::{AppError, ThrottledError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Request throttled, try again shortly")]
    Throttled,

    #[error("AI service unavailable: {0}")]
    Unavailable(String),
}

impl AiError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "Please type a question first.",
            Self::Throttled => "Please wait a moment before asking again.",
            Self::Unavailable(_) => "Error: Unable to get AI response.",
        }
    }
}

impl ThrottledError for AiError {
    fn throttled() -> Self {
        Self::Throttled
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::EmptyPrompt => AppError::EmptyQuery(e.to_string()),
            AiError::Throttled => AppError::Throttled,
            AiError::Unavailable(msg) => AppError::AiUnavailable(msg),
        }
    }
}
