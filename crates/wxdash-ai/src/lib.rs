//! Natural-language weather questions answered by a chat-completion API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{AiClient, AiClientConfig};
pub use error::AiError;
