//! Ollama LLM client implementation.
//!
//! Implements the LlmClient trait for local Ollama instances.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::llm::types::{Completion, Message, TokenUsage};
use crate::llm::LlmClient;

/// Default timeout for API requests. Local models can be slow to load.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default Ollama API URL.
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Model used when neither config nor `OLLAMA_MODEL` names one.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model to use (e.g., "llama3.2:3b", "codellama").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Creates a new config with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_MODEL)
    }
}

/// Ollama LLM client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    /// Creates a new Ollama client with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads `OLLAMA_URL` for the base URL (defaults to http://localhost:11434).
    /// `model` wins over `OLLAMA_MODEL`, which wins over the built-in default.
    pub fn from_env(model: Option<String>) -> Result<Self> {
        let base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = model
            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());

        Self::new(OllamaConfig::new(model).with_url(base_url))
    }

    /// Converts internal messages to Ollama API format.
    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Returns the chat API endpoint URL.
    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url)
    }
}

/// Pulls evaluation counts out of a non-streaming `/api/chat` response body.
pub fn extract_usage(body: &serde_json::Value) -> Option<TokenUsage> {
    Some(TokenUsage::new(
        body.get("prompt_eval_count")?.as_u64()?,
        body.get("eval_count")?.as_u64()?,
    ))
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            stream: false,
        };

        debug!(model = %self.config.model, url = %self.chat_url(), "Sending Ollama request");

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::llm("Request timed out. Try again.")
                } else if e.is_connect() {
                    ChatError::llm("Failed to connect to Ollama. Is it running? Try: ollama serve")
                } else {
                    ChatError::llm(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::llm(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ChatError::llm(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ChatError::llm(format!("Failed to parse response: {}", e)))?;
        let usage = extract_usage(&raw);
        let response: OllamaResponse = serde_json::from_value(raw)
            .map_err(|e| ChatError::llm(format!("Failed to parse response: {}", e)))?;

        Ok(Completion {
            text: response.message.content,
            usage,
        })
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_chat_url_strips_trailing_slash() {
        let client =
            OllamaClient::new(OllamaConfig::new("codellama").with_url("http://gpu-box:11434/"))
                .unwrap();
        assert_eq!(client.chat_url(), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn test_extract_usage() {
        let body = json!({
            "model": "llama3.2:3b",
            "message": {"role": "assistant", "content": "SELECT 1"},
            "done": true,
            "prompt_eval_count": 96,
            "eval_count": 4
        });
        assert_eq!(extract_usage(&body), Some(TokenUsage::new(96, 4)));
        assert_eq!(extract_usage(&json!({"done": true})), None);
    }

    #[test]
    fn test_response_parsing() {
        let response: OllamaResponse = serde_json::from_value(json!({
            "message": {"role": "assistant", "content": "There are 3 users."},
            "done": true
        }))
        .unwrap();
        assert_eq!(response.message.content, "There are 3 users.");
    }
}
