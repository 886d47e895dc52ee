//! Language model passthrough.
//!
//! The daemon forwards prompts and chats to an upstream model and returns its
//! text verbatim. Upstream failures are reported as opaque strings; nothing
//! here interprets them.

use crate::config::{LlmConfig, LlmKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tally_types::ChatMessage;
use thiserror::Error;

const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Upstream model failure, carried as the upstream's own description.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LlmError(pub String);

/// A model that answers prompts and chats.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn prompt(&self, prompt: &str) -> Result<String, LlmError>;

    /// Returns the assistant's reply, or an empty string when the model
    /// produced no text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// HTTP-backed [`LanguageModel`] speaking the Ollama or OpenAI dialect.
pub struct HttpLanguageModel {
    client: Client,
    config: LlmConfig,
}

impl HttpLanguageModel {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        let allow_system_proxy = std::env::var("TALLY_USE_SYSTEM_PROXY")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        if !allow_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| LlmError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> &str {
        let configured = self.config.endpoint.trim();
        if !configured.is_empty() {
            return configured.trim_end_matches('/');
        }
        match self.config.kind {
            LlmKind::Ollama => DEFAULT_OLLAMA_ENDPOINT,
            LlmKind::OpenAi => DEFAULT_OPENAI_ENDPOINT,
        }
    }

    async fn post(&self, url: &str, payload: &Value, dialect: &str) -> Result<reqwest::Response, LlmError> {
        let mut request = self.client.post(url).json(payload);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError(format!("{} request failed: {}", dialect, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError(format!(
                "{} error {}: {}",
                dialect,
                status,
                truncate(&body, 320)
            )));
        }

        Ok(response)
    }

    async fn ollama_generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint());
        let payload = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        let body: OllamaGenerateResponse = self
            .post(&url, &payload, "ollama")
            .await?
            .json()
            .await
            .map_err(|e| LlmError(format!("invalid ollama response: {}", e)))?;

        Ok(body.response)
    }

    async fn ollama_chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint());
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
        });

        let body: OllamaChatResponse = self
            .post(&url, &payload, "ollama")
            .await?
            .json()
            .await
            .map_err(|e| LlmError(format!("invalid ollama response: {}", e)))?;

        Ok(body
            .message
            .and_then(|message| message.content)
            .unwrap_or_default())
    }

    async fn openai_chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let body: OpenAiResponse = self
            .post(self.endpoint(), &payload, "openai")
            .await?
            .json()
            .await
            .map_err(|e| LlmError(format!("invalid openai response: {}", e)))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(extract_text)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn prompt(&self, prompt: &str) -> Result<String, LlmError> {
        match self.config.kind {
            LlmKind::Ollama => self.ollama_generate(prompt).await,
            LlmKind::OpenAi => self.openai_chat(&[ChatMessage::user(prompt)]).await,
        }
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        match self.config.kind {
            LlmKind::Ollama => self.ollama_chat(messages).await,
            LlmKind::OpenAi => self.openai_chat(messages).await,
        }
    }
}

/// OpenAI content is either a string or a list of typed parts.
fn extract_text(content: Value) -> String {
    match content {
        Value::String(text) => text,
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
