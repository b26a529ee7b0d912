//! Response orchestrator.
//!
//! Runs the three linear stages for one question:
//! 1. SQL generation from schema, question and history.
//! 2. Execution plus explanation. Execution failures become the `None` sentinel.
//! 3. Domain fallback when the explanation carries the unrelated marker.

use std::time::Instant;

use crate::chain::Chain;
use crate::conversation::{Conversation, HistoryWindow};
use crate::db::{self, DatabaseClient, ExecutionOutcome};
use crate::error::Result;
use crate::llm::{Completion, LlmClient, TokenUsage};

pub use crate::chain::UNRELATED_MARKER;

/// True when the model flagged the question as outside the database.
///
/// This is a verbatim, case-sensitive substring match. A paraphrase of the
/// marker does not count.
pub fn is_unrelated_answer(text: &str) -> bool {
    text.contains(UNRELATED_MARKER)
}

/// Final result of one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Text shown to the user and appended to the conversation.
    pub text: String,
    /// SQL produced by the first stage, trimmed of surrounding whitespace.
    pub sql: String,
    /// What happened when the SQL ran.
    pub execution: ExecutionOutcome,
    /// Whether the general-knowledge chain replaced the explanation.
    pub used_fallback: bool,
    /// Sum of the usage reported by every model call for this question.
    pub usage: TokenUsage,
}

/// Composes the SQL, response and global chains.
pub struct ResponseOrchestrator {
    client: Box<dyn LlmClient>,
    window: HistoryWindow,
    sql_chain: Chain,
    response_chain: Chain,
    global_chain: Chain,
}

impl ResponseOrchestrator {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            window: HistoryWindow::default(),
            sql_chain: Chain::sql_query(),
            response_chain: Chain::response(),
            global_chain: Chain::global(),
        }
    }

    pub fn with_history_window(mut self, window: HistoryWindow) -> Self {
        self.window = window;
        self
    }

    /// Answers `question` against `db`.
    ///
    /// `conversation` is read as-is, so callers that want the current question
    /// in the history should append it first. Model errors propagate.
    pub async fn respond(
        &self,
        db: &dyn DatabaseClient,
        question: &str,
        conversation: &Conversation,
    ) -> Result<Answer> {
        let start = Instant::now();
        let history = conversation.render_for_prompt(self.window);
        let mut usage = TokenUsage::default();
        tracing::debug!(
            question_len = question.len(),
            history_len = history.len(),
            "Answering question"
        );

        // Stage 1: SQL generation
        let schema = db::get_schema(db).await?;
        let completion = self
            .sql_chain
            .invoke(
                self.client.as_ref(),
                &[
                    ("schema", schema.as_str()),
                    ("question", question),
                    ("chat_history", history.as_str()),
                ],
            )
            .await?;
        let sql = accumulate(&mut usage, completion).trim().to_string();
        tracing::debug!(sql = %sql, "Generated SQL");

        // Stage 2: execution and explanation
        let execution = db::execute(db, &sql).await;
        let response_text = execution.to_prompt_text();
        let schema = db::get_schema(db).await?;
        let completion = self
            .response_chain
            .invoke(
                self.client.as_ref(),
                &[
                    ("schema", schema.as_str()),
                    ("chat_history", history.as_str()),
                    ("question", question),
                    ("query", sql.as_str()),
                    ("response", response_text.as_str()),
                ],
            )
            .await?;
        let candidate = accumulate(&mut usage, completion);

        // Stage 3: domain fallback
        let (text, used_fallback) = if is_unrelated_answer(&candidate) {
            tracing::info!("Question judged unrelated to the database, answering globally");
            let completion = self
                .global_chain
                .invoke(self.client.as_ref(), &[("question", question)])
                .await?;
            (accumulate(&mut usage, completion), true)
        } else {
            (candidate, false)
        };

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            execution_failed = execution.is_failed(),
            used_fallback,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Question answered"
        );

        Ok(Answer {
            text,
            sql,
            execution,
            used_fallback,
            usage,
        })
    }
}

fn accumulate(total: &mut TokenUsage, completion: Completion) -> String {
    if let Some(usage) = completion.usage {
        *total += usage;
    }
    completion.text
}
