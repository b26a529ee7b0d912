//! Session context.
//!
//! Owns the database handle, the conversation log, the orchestrator and the
//! running token total for one interactive session.

use crate::config::{ChatConfig, ConnectionConfig};
use crate::conversation::Conversation;
use crate::db::{self, DatabaseClient};
use crate::error::{ChatError, ConnectionFailure, Result};
use crate::llm::TokenUsage;
use crate::orchestrator::{Answer, ResponseOrchestrator};
use tracing::{info, warn};

/// Reply given when a question arrives before any database is connected.
pub const NOT_CONNECTED_MESSAGE: &str = "Please connect to the database first.";

struct ActiveConnection {
    client: Box<dyn DatabaseClient>,
    label: String,
}

/// One user's chat session.
pub struct Session {
    orchestrator: ResponseOrchestrator,
    conversation: Conversation,
    connection: Option<ActiveConnection>,
    usage: TokenUsage,
    last_answer: Option<Answer>,
}

impl Session {
    pub fn new(orchestrator: ResponseOrchestrator, chat: &ChatConfig) -> Self {
        Self {
            orchestrator: orchestrator.with_history_window(chat.history_window()),
            conversation: Conversation::new(chat.greeting.clone()),
            connection: None,
            usage: TokenUsage::default(),
            last_answer: None,
        }
    }

    /// Opens a connection and makes it the session's handle.
    ///
    /// On failure the previous handle, if any, stays in place.
    pub async fn connect(&mut self, config: &ConnectionConfig) -> Result<()> {
        let client = db::connect(config).await?;
        self.attach(client, config.display_string()).await;
        Ok(())
    }

    /// Replaces the handle with an already-open client.
    pub async fn attach(&mut self, client: Box<dyn DatabaseClient>, label: impl Into<String>) {
        let label = label.into();
        if let Some(previous) = self.connection.take() {
            if let Err(e) = previous.client.close().await {
                warn!("Failed to close previous connection {}: {}", previous.label, e);
            }
        }
        info!("Connected to {}", label);
        self.connection = Some(ActiveConnection { client, label });
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Display label of the current connection.
    pub fn connection_label(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.label.as_str())
    }

    /// Asks one question and returns the reply appended to the conversation.
    ///
    /// Blank input is ignored and returns `Ok(None)`. The question is logged
    /// before any chain runs. If the model fails, the question stays in the
    /// log, no reply is appended and the error is returned.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        if question.trim().is_empty() {
            return Ok(None);
        }

        self.conversation.push_human(question);

        let Some(connection) = &self.connection else {
            self.conversation.push_ai(NOT_CONNECTED_MESSAGE);
            return Ok(Some(NOT_CONNECTED_MESSAGE.to_string()));
        };

        let answer = self
            .orchestrator
            .respond(connection.client.as_ref(), question, &self.conversation)
            .await?;

        self.usage += answer.usage;
        self.conversation.push_ai(answer.text.clone());
        let text = answer.text.clone();
        self.last_answer = Some(answer);
        Ok(Some(text))
    }

    /// Current schema snapshot as the model sees it.
    pub async fn schema_text(&self) -> Result<String> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| {
                ChatError::connection_failure(
                    ConnectionFailure::NotConnected,
                    NOT_CONNECTED_MESSAGE,
                )
            })?;
        db::get_schema(connection.client.as_ref()).await
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Tokens used by every answered question so far.
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Details of the most recent answered question.
    pub fn last_answer(&self) -> Option<&Answer> {
        self.last_answer.as_ref()
    }

    /// Closes the database handle, if any.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.client.close().await?;
        }
        Ok(())
    }
}
