//! Mock LLM client for testing and offline demos.
//!
//! Scripted responses are returned first, in order. Once the script runs out
//! the mock answers from the prompt itself: it picks a table named in the
//! question, explains whatever rows came back, and flags anything without a
//! table as unrelated.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::chain::UNRELATED_MARKER;
use crate::error::{ChatError, Result};
use crate::llm::types::{Completion, Message, TokenUsage};
use crate::llm::LlmClient;

#[derive(Debug, Default)]
struct MockState {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

/// Mock LLM client. Clones share the same script and call record.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    state: Arc<MockState>,
}

impl MockLlmClient {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a completion to return on the next unanswered call.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        if let Ok(mut script) = self.state.script.lock() {
            script.push_back(Ok(response.into()));
        }
        self
    }

    /// Queues a provider failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        if let Ok(mut script) = self.state.script.lock() {
            script.push_back(Err(message.into()));
        }
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.state
            .prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.state
            .prompts
            .lock()
            .map(|prompts| prompts.len())
            .unwrap_or(0)
    }

    fn next_scripted(&self) -> Option<std::result::Result<String, String>> {
        self.state
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if let Ok(mut prompts) = self.state.prompts.lock() {
            prompts.push(prompt.clone());
        }

        let text = match self.next_scripted() {
            Some(Ok(text)) => text,
            Some(Err(message)) => return Err(ChatError::llm(message)),
            None => heuristic_response(&prompt),
        };

        let usage = TokenUsage::new(word_count(&prompt), word_count(&text));
        Ok(Completion::text(text).with_usage(usage))
    }
}

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Value of the last `label` line in the prompt.
fn last_field<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
}

fn heuristic_response(prompt: &str) -> String {
    if let Some(question) = prompt.strip_prefix("The user has asked a question: ") {
        let question = question.lines().next().unwrap_or_default().trim();
        return format!(
            "Here is a general answer to \"{question}\": \
             I am a mock model and cannot look that up."
        );
    }

    if let Some(response) = last_field(prompt, "SQL Response:") {
        let query = last_field(prompt, "SQL Query:").unwrap_or_default();
        if query.to_lowercase().contains(" from ") {
            return format!("The query returned: {response}");
        }
        return format!("{UNRELATED_MARKER} Let me answer from general knowledge.");
    }

    let question = last_field(prompt, "Question:").unwrap_or_default().to_lowercase();
    let table = prompt
        .lines()
        .filter_map(|line| line.strip_prefix("Table: "))
        .map(str::trim)
        .find(|table| mentions_table(&question, table));

    match table {
        Some(table) if question.contains("how many") || question.contains("count") => {
            format!("SELECT COUNT(*) FROM {table}")
        }
        Some(table) => format!("SELECT * FROM {table} LIMIT 10"),
        None => "SELECT NULL".to_string(),
    }
}

fn mentions_table(question: &str, table: &str) -> bool {
    let table = table.to_lowercase();
    let singular = table.strip_suffix('s').unwrap_or(&table);
    question
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|word| word == table || (!singular.is_empty() && word == singular))
}
