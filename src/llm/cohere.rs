//! Cohere LLM client implementation.
//!
//! Implements the LlmClient trait for Cohere's v2 chat API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::llm::types::{Completion, Message, TokenUsage};
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Cohere chat endpoint.
const COHERE_API_URL: &str = "https://api.cohere.com/v2/chat";

/// Model used when neither config nor `COHERE_MODEL` names one.
pub const DEFAULT_COHERE_MODEL: &str = "command-r-plus";

/// Cohere client configuration.
#[derive(Debug, Clone)]
pub struct CohereConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "command-r-plus", "command-r").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl CohereConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Cohere LLM client.
#[derive(Debug, Clone)]
pub struct CohereClient {
    config: CohereConfig,
    client: Client,
}

impl CohereClient {
    /// Creates a new Cohere client with the given configuration.
    pub fn new(config: CohereConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn convert_messages(messages: &[Message]) -> Vec<CohereMessage> {
        messages
            .iter()
            .map(|m| CohereMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Parses an API error response.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> ChatError {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ChatError::llm("Authentication failed. Check your COHERE_API_KEY.");
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return ChatError::llm("Rate limited. Please wait and try again.");
        }

        if let Ok(error_response) = serde_json::from_str::<CohereErrorResponse>(body) {
            return ChatError::llm(format!("Cohere API error: {}", error_response.message));
        }

        ChatError::llm(format!("Cohere API error ({}): {}", status, body))
    }
}

/// Pulls token counts out of a v2 chat response body.
///
/// Prefers `billed_units`, falling back to raw `tokens` counts.
pub fn extract_usage(body: &serde_json::Value) -> Option<TokenUsage> {
    let usage = body.get("usage")?;
    let counts = usage
        .get("billed_units")
        .filter(|units| units.get("input_tokens").is_some())
        .or_else(|| usage.get("tokens"))?;

    Some(TokenUsage::new(
        counts.get("input_tokens")?.as_u64()?,
        counts.get("output_tokens")?.as_u64()?,
    ))
}

#[async_trait]
impl LlmClient for CohereClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        let request = CohereRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
        };

        debug!(model = %self.config.model, "Sending Cohere request");

        let response = self
            .client
            .post(COHERE_API_URL)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::llm("Request timed out. Try again.")
                } else if e.is_connect() {
                    ChatError::llm("Failed to connect to Cohere API. Check your network.")
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
            return Err(Self::parse_error(status, &body));
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ChatError::llm(format!("Failed to parse response: {}", e)))?;
        let usage = extract_usage(&raw);
        let response: CohereResponse = serde_json::from_value(raw)
            .map_err(|e| ChatError::llm(format!("Failed to parse response: {}", e)))?;

        let text = response
            .message
            .content
            .into_iter()
            .filter(|part| part.part_type == "text")
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ChatError::llm("No response from Cohere"));
        }

        Ok(Completion { text, usage })
    }
}

// Cohere API types

#[derive(Debug, Serialize)]
struct CohereRequest {
    model: String,
    messages: Vec<CohereMessage>,
}

#[derive(Debug, Serialize)]
struct CohereMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CohereResponse {
    message: CohereResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CohereResponseMessage {
    #[serde(default)]
    content: Vec<CohereContentPart>,
}

#[derive(Debug, Deserialize)]
struct CohereContentPart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CohereErrorResponse {
    message: String,
}
