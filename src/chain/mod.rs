//! Prompt chains: template fill, one model call, raw text out.
//!
//! A chain never parses, validates or retries what the model returns.

mod prompts;

pub use prompts::{
    GLOBAL_TEMPLATE, RESPONSE_TEMPLATE, RETRY_PHRASE, SQL_QUERY_TEMPLATE, UNRELATED_MARKER,
};

use crate::error::{ChatError, Result};
use crate::llm::{Completion, LlmClient, Message};
use tracing::debug;

/// A prompt with `{name}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    template: &'static str,
}

impl PromptTemplate {
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    pub fn as_str(&self) -> &'static str {
        self.template
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.template;
        while let Some((name, after)) = next_placeholder(rest) {
            if let Some(name) = name {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            rest = after;
        }
        names
    }

    /// Fills every placeholder in a single pass.
    ///
    /// Substituted values are not rescanned, so a question containing
    /// `{schema}` is sent as typed. A placeholder without a value is an
    /// internal error.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let mut output = String::with_capacity(self.template.len());
        let mut rest = self.template;

        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            match next_placeholder(&rest[open..]) {
                Some((Some(name), after)) => {
                    let value = vars
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            ChatError::internal(format!(
                                "Prompt variable '{name}' was not provided"
                            ))
                        })?;
                    output.push_str(value);
                    rest = after;
                }
                _ => {
                    output.push('{');
                    rest = &rest[open + 1..];
                }
            }
        }
        output.push_str(rest);

        Ok(output)
    }
}

/// Finds the next `{...}` in `text`. Yields the name when the braces hold an
/// identifier, plus the remainder after the closing brace.
fn next_placeholder(text: &'static str) -> Option<(Option<&'static str>, &'static str)> {
    let open = text.find('{')?;
    let after_open = &text[open + 1..];
    match after_open.find('}') {
        Some(close) => {
            let name = &after_open[..close];
            let is_ident = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if is_ident {
                Some((Some(name), &after_open[close + 1..]))
            } else {
                Some((None, after_open))
            }
        }
        None => Some((None, after_open)),
    }
}

/// One request/response unit against the language model.
#[derive(Debug, Clone, Copy)]
pub struct Chain {
    name: &'static str,
    template: PromptTemplate,
}

impl Chain {
    pub const fn new(name: &'static str, template: PromptTemplate) -> Self {
        Self { name, template }
    }

    /// Question -> SQL text.
    pub const fn sql_query() -> Self {
        Self::new("sql_query", SQL_QUERY_TEMPLATE)
    }

    /// SQL result -> prose.
    pub const fn response() -> Self {
        Self::new("response", RESPONSE_TEMPLATE)
    }

    /// Context-free general answer.
    pub const fn global() -> Self {
        Self::new("global", GLOBAL_TEMPLATE)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Renders the template and sends it as a single user message.
    ///
    /// The completion text is returned exactly as the model produced it.
    pub async fn invoke(
        &self,
        client: &dyn LlmClient,
        vars: &[(&str, &str)],
    ) -> Result<Completion> {
        let prompt = self.template.render(vars)?;
        debug!(chain = self.name, prompt_chars = prompt.len(), "Invoking chain");

        let completion = client.complete(&[Message::user(prompt)]).await?;
        debug!(
            chain = self.name,
            completion_chars = completion.text.len(),
            "Chain completed"
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    const GREETING: PromptTemplate = PromptTemplate::new("Hi {name}, you asked: {question}");

    #[test]
    fn test_render_fills_placeholders() {
        let text = GREETING
            .render(&[("name", "Ada"), ("question", "how many users?")])
            .unwrap();
        assert_eq!(text, "Hi Ada, you asked: how many users?");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let text = GREETING
            .render(&[("name", "{question}"), ("question", "q")])
            .unwrap();
        assert_eq!(text, "Hi {question}, you asked: q");
    }

    #[test]
    fn test_render_missing_variable_is_internal_error() {
        let err = GREETING.render(&[("name", "Ada")]).unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn test_render_keeps_non_placeholder_braces() {
        const JSONISH: PromptTemplate = PromptTemplate::new("{\"a\": 1} {x} {");
        assert_eq!(JSONISH.render(&[("x", "y")]).unwrap(), "{\"a\": 1} y {");
        assert_eq!(JSONISH.variables(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_invoke_sends_single_user_message_and_returns_raw_text() {
        let client = MockLlmClient::new().with_response("  SELECT 1;\n");
        let completion = Chain::global()
            .invoke(&client, &[("question", "What is 1?")])
            .await
            .unwrap();

        assert_eq!(completion.text, "  SELECT 1;\n");
        assert_eq!(
            client.prompts(),
            vec!["The user has asked a question: What is 1?\nProvide a comprehensive answer.\n"]
        );
    }

    #[tokio::test]
    async fn test_invoke_propagates_model_error() {
        let client = MockLlmClient::new().with_failure("service unavailable");
        let err = Chain::sql_query()
            .invoke(
                &client,
                &[("schema", ""), ("question", "q"), ("chat_history", "")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
    }

    #[tokio::test]
    async fn test_invoke_render_failure_skips_model_call() {
        let client = MockLlmClient::new();
        let result = Chain::response().invoke(&client, &[("question", "q")]).await;
        assert!(result.is_err());
        assert_eq!(client.call_count(), 0);
    }
}
