//! Narrative providers — the seam between the pipeline and language models.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::NarrativeError;

/// One language-model backend (allows stubbing in tests).
pub trait NarrativeProvider: Send + Sync {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a narrative for `prompt` under `system` instructions.
    fn invoke(&self, system: &str, prompt: &str) -> Result<String, NarrativeError>;
}

/// OpenRouter chat-completions backend for one model id.
pub struct OpenRouterProvider {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;

// ── wire types ──

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: &str, model: &str) -> Result<Self, NarrativeError> {
        Self::with_base_url(OPENROUTER_BASE_URL, api_key, model)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        model: &str,
    ) -> Result<Self, NarrativeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NarrativeError::Provider {
                name: model.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        })
    }
}

impl NarrativeProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn invoke(&self, system: &str, prompt: &str) -> Result<String, NarrativeError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, "requesting narrative");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| NarrativeError::Provider {
                name: self.model.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrativeError::Provider {
                name: self.model.clone(),
                message: format!("HTTP {status}"),
            });
        }

        let body: ChatResponse = response.json().map_err(|e| NarrativeError::Provider {
            name: self.model.clone(),
            message: format!("malformed response: {e}"),
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(NarrativeError::EmptyResponse {
                name: self.model.clone(),
            });
        }
        Ok(content)
    }
}
