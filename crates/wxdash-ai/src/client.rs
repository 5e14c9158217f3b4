//! Chat-completion client with an answer cache and a shared throttle.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::instrument;
use wxdash_core::{AiConfig, Clock, GateConfig, RequestGate, SystemClock, ThrottleScope};

use crate::error::AiError;
use crate::types::{ChatMessage, ChatRequest, ChatResponse};

const CHAT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_MAX_TOKENS: u32 = 100;
const DEFAULT_THROTTLE: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prepended to every question.
pub const CONCISE_INSTRUCTION: &str =
    "Answer concisely about the current weather in one or two sentences: ";

#[derive(Debug, Clone)]
pub struct AiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub throttle: Duration,
    pub timeout: Duration,
}

impl AiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: CHAT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            throttle: DEFAULT_THROTTLE,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl From<&AiConfig> for AiClientConfig {
    fn from(config: &AiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            throttle: config.throttle(),
            timeout: config.timeout(),
        }
    }
}

/// Answers are cached per trimmed prompt for the life of the client; one
/// throttle window covers every prompt.
pub struct AiClient {
    client: Client,
    api_key: String,
    url: String,
    model: String,
    max_tokens: u32,
    answers: RequestGate<String, AiError>,
}

impl AiClient {
    pub fn new(config: AiClientConfig) -> Result<Self, AiError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AiClientConfig, clock: Arc<dyn Clock>) -> Result<Self, AiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let gate_config = GateConfig::new(None, config.throttle, ThrottleScope::Shared);

        Ok(Self {
            client,
            api_key: config.api_key,
            url: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model,
            max_tokens: config.max_tokens,
            answers: RequestGate::new("ai", gate_config, clock),
        })
    }

    /// Ask a question about the weather.
    #[instrument(skip(self), level = "info")]
    pub async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        let client = self.client.clone();
        let url = self.url.clone();
        let auth = format!("Bearer {}", self.api_key);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(format!("{}{}", CONCISE_INSTRUCTION, prompt))],
            max_tokens: self.max_tokens,
        };

        self.answers
            .run(prompt, move || async move {
                tracing::info!("Sending prompt to {}", url);
                let response = client
                    .post(&url)
                    .header("Authorization", auth)
                    .json(&body)
                    .send()
                    .await?;
                handle_response(response).await
            })
            .await
    }

    /// Previously fetched answer for `prompt`, if any.
    pub fn cached_answer(&self, prompt: &str) -> Option<String> {
        self.answers.cached(prompt.trim())
    }
}

async fn handle_response(response: reqwest::Response) -> Result<String, AiError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!("AI provider returned {}: {}", status, text);
        return Err(AiError::Unavailable(format!("{}: {}", status, text)));
    }

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| AiError::Unavailable(format!("JSON parse error: {}", e)))?;

    body.first_answer()
        .map(|answer| answer.trim().to_string())
        .ok_or_else(|| AiError::Unavailable("Response has no completion text".to_string()))
}
