//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::error::{ChatError, Result};
use crate::llm::anthropic::DEFAULT_ANTHROPIC_MODEL;
use crate::llm::cohere::DEFAULT_COHERE_MODEL;
use crate::llm::openai::DEFAULT_OPENAI_MODEL;
use crate::llm::{
    AnthropicClient, AnthropicConfig, CohereClient, CohereConfig, LlmClient, LlmProvider,
    MockLlmClient, OllamaClient, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client for the given provider.
///
/// If `api_key` is provided, it takes precedence over environment variables.
/// For providers that require an API key the key is resolved in order:
/// 1. Provided `api_key` parameter
/// 2. Environment variable (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY` or `COHERE_API_KEY`)
///
/// `model` takes precedence over the provider's `*_MODEL` environment variable,
/// which in turn overrides the built-in default.
pub fn create_client(
    provider: LlmProvider,
    api_key: Option<String>,
    model: Option<String>,
) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::OpenAi => {
            let key = resolve_key(api_key, "OPENAI_API_KEY")?;
            let model = resolve_model(model, "OPENAI_MODEL", DEFAULT_OPENAI_MODEL);
            Ok(Box::new(OpenAiClient::new(OpenAiConfig::new(key, model))?))
        }
        LlmProvider::Anthropic => {
            let key = resolve_key(api_key, "ANTHROPIC_API_KEY")?;
            let model = resolve_model(model, "ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL);
            Ok(Box::new(AnthropicClient::new(AnthropicConfig::new(
                key, model,
            ))?))
        }
        LlmProvider::Cohere => {
            let key = resolve_key(api_key, "COHERE_API_KEY")?;
            let model = resolve_model(model, "COHERE_MODEL", DEFAULT_COHERE_MODEL);
            Ok(Box::new(CohereClient::new(CohereConfig::new(key, model))?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_env(model)?)),
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

fn resolve_key(api_key: Option<String>, env_var: &str) -> Result<String> {
    api_key
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            ChatError::llm(format!(
                "No API key configured. Set {env_var} in the environment or a .env file."
            ))
        })
}

fn resolve_model(model: Option<String>, env_var: &str, default: &str) -> String {
    model
        .or_else(|| std::env::var(env_var).ok())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_client() {
        let client = create_client(LlmProvider::Mock, None, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_openai_with_provided_key() {
        let result = create_client(LlmProvider::OpenAi, Some("test-key".to_string()), None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_anthropic_with_provided_key() {
        let result = create_client(
            LlmProvider::Anthropic,
            Some("test-key".to_string()),
            Some("claude-3-5-haiku-latest".to_string()),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_cohere_without_key_fails() {
        // Temporarily unset the env var if it exists
        let original = std::env::var("COHERE_API_KEY").ok();
        std::env::remove_var("COHERE_API_KEY");

        let result = create_client(LlmProvider::Cohere, None, None);
        let err = result.err().unwrap();
        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("COHERE_API_KEY"));

        // Restore
        if let Some(key) = original {
            std::env::set_var("COHERE_API_KEY", key);
        }
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let err = resolve_key(Some("   ".to_string()), "SQLCHAT_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
    }

    #[test]
    fn test_explicit_model_wins() {
        assert_eq!(
            resolve_model(Some("gpt-4o-mini".into()), "SQLCHAT_TEST_UNSET_MODEL", "gpt-4o"),
            "gpt-4o-mini"
        );
        assert_eq!(
            resolve_model(None, "SQLCHAT_TEST_UNSET_MODEL", "gpt-4o"),
            "gpt-4o"
        );
    }
}
