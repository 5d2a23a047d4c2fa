//! Text-completion client with multi-provider support (Gemini, OpenAI-compatible)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

const GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Reply text used when Gemini answers without any candidate text
pub const GEMINI_EMPTY_REPLY: &str = "No response from Gemini";

/// Status reported for failures that never produced an HTTP response
const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Errors from a single completion call
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("API returned error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to call completion API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),
}

impl CompletionError {
    /// HTTP-style status code for the failure, when one applies
    pub fn status(&self) -> Option<u16> {
        match self {
            CompletionError::Status { status, .. } => Some(*status),
            CompletionError::Transport(e) => {
                Some(e.status().map(|s| s.as_u16()).unwrap_or(TRANSPORT_FAILURE_STATUS))
            }
            CompletionError::InvalidResponse(_) => Some(TRANSPORT_FAILURE_STATUS),
            CompletionError::MissingApiKey(_) => None,
        }
    }
}

/// A text-in, text-out completion backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Run one completion. Attempted exactly once, never retried.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

// ============ Provider Configuration ============

/// Wire dialect spoken by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Generative Language `generateContent`
    Gemini,
    /// OpenRouter and other `/chat/completions` providers
    OpenAiCompatible,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAiCompatible => "openai_compatible",
        }
    }
}

/// Configuration for a completion provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Full endpoint for Gemini, API base for OpenAI-compatible providers
    pub base_url: String,
    pub api_key: String,
    /// Ignored by Gemini, whose model is part of the URL
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Gemini provider at the default endpoint
    pub fn gemini(api_key: String) -> Self {
        Self {
            kind: ProviderKind::Gemini,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model: String::new(),
            temperature: 0.7,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }

    /// OpenRouter provider with the given model
    pub fn openrouter(api_key: String, model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::OpenAiCompatible,
            base_url: OPENROUTER_BASE_URL.to_string(),
            api_key,
            model: model.into(),
            temperature: 0.7,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build from the `[llm]` config section
    pub fn from_config(config: &crate::config::LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config
            .resolve_api_key()
            .ok_or(CompletionError::MissingApiKey(config.provider.name()))?;
        let mut provider = match config.provider {
            ProviderKind::Gemini => Self::gemini(api_key),
            ProviderKind::OpenAiCompatible => Self::openrouter(api_key, config.model.clone()),
        };
        if let Some(url) = &config.base_url {
            provider.base_url = url.clone();
        }
        provider.temperature = config.temperature;
        provider.max_output_tokens = config.max_output_tokens;
        provider.timeout = Duration::from_secs(config.timeout_secs);
        Ok(provider)
    }
}

/// HTTP completion client
#[derive(Clone)]
pub struct LlmClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl LlmClient {
    pub fn new(provider: ProviderConfig) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(provider.timeout).build()?;
        Ok(Self {
            client: Arc::new(client),
            provider,
        })
    }

    /// Create client from the loaded configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self, CompletionError> {
        Self::new(ProviderConfig::from_config(&config.llm)?)
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Send a short test prompt and report whether a usable reply came back
    pub async fn test_connection(&self) -> bool {
        match self.complete("Say 'Hello, World!' if you can hear me.").await {
            Ok(reply) => !reply.starts_with("Error"),
            Err(e) => {
                error!("Completion API connection test failed: {}", e);
                false
            }
        }
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.provider.temperature,
                "maxOutputTokens": self.provider.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&self.provider.base_url)
            .query(&[("key", self.provider.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let raw = read_success_body(response).await?;
        Ok(extract_gemini_text(&raw))
    }

    async fn complete_chat(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = json!({
            "model": self.provider.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.provider.temperature,
            "max_tokens": self.provider.max_output_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", self.provider.api_key))
            .json(&body)
            .send()
            .await?;

        let raw = read_success_body(response).await?;
        extract_chat_text(&raw)
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        debug!(provider = self.provider.kind.name(), "Sending completion request");
        match self.provider.kind {
            ProviderKind::Gemini => self.complete_gemini(prompt).await,
            ProviderKind::OpenAiCompatible => self.complete_chat(prompt).await,
        }
    }
}

/// Completion backend used when no API key is configured; every call fails
/// with [`CompletionError::MissingApiKey`].
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredCompletion {
    provider: ProviderKind,
}

impl UnconfiguredCompletion {
    pub fn new(provider: ProviderKind) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TextCompletion for UnconfiguredCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::MissingApiKey(self.provider.name()))
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<Value, CompletionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "No error body".to_string());
        error!("Completion API call failed with status: {} - Response: {}", status, body);
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        CompletionError::InvalidResponse(format!("{} (body: {})", e, truncate(&text, 500)))
    })
}

/// Text of the first part of the first Gemini candidate
pub fn extract_gemini_text(raw: &Value) -> String {
    let text = raw
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .and_then(|arr| arr.first())
        .and_then(|part| part.get("text"))
        .and_then(|t| t.as_str());

    match text {
        Some(t) => t.to_string(),
        None => {
            warn!("No valid response from Gemini API");
            GEMINI_EMPTY_REPLY.to_string()
        }
    }
}

/// Message content of the first choice, either a string or text content parts
pub fn extract_chat_text(raw: &Value) -> Result<String, CompletionError> {
    let content = raw
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"));

    match content {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Array(parts)) => Ok(parts
            .iter()
            .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("")),
        _ => Err(CompletionError::InvalidResponse(
            "response has no choices[0].message.content".to_string(),
        )),
    }
}

/// Truncate to at most `max` bytes without splitting a character
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
