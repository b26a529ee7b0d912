//! Interactive shell.
//!
//! Line-based REPL over any async reader/writer pair. Slash commands manage
//! the connection and inspect the session; everything else is a question.

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::session::Session;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const HELP_TEXT: &str = r#"Available commands:
  /connect [user@host[:port]/db | sqlite://path]
                   - Connect to a database (defaults from CLI/config)
  /schema          - Show the schema snapshot given to the model
  /history         - Show the whole conversation
  /usage           - Show token usage for this session
  /help            - Show this help message
  /quit, /exit     - Exit

Anything else is sent as a question about the connected database."#;

const PROMPT: &str = "> ";

/// What the shell should do after one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    /// Nothing to print.
    None,
    /// Lines to print.
    Output(Vec<String>),
    /// Leave the loop.
    Exit,
}

/// REPL front-end for a `Session`.
pub struct Shell {
    session: Session,
    default_connection: ConnectionConfig,
}

impl Shell {
    /// `default_connection` is used by a bare `/connect`.
    pub fn new(session: Session, default_connection: ConnectionConfig) -> Self {
        Self {
            session,
            default_connection,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until end of input or `/quit`, then closes the connection.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let greeting = self
            .session
            .conversation()
            .turns()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        write_lines(&mut writer, &[greeting]).await?;

        let mut lines = reader.lines();
        loop {
            write_prompt(&mut writer).await?;
            let Some(line) = lines.next_line().await.map_err(io_error)? else {
                break;
            };

            match self.handle_input(&line).await {
                InputResult::None => {}
                InputResult::Output(output) => write_lines(&mut writer, &output).await?,
                InputResult::Exit => break,
            }
        }

        if let Err(e) = self.session.close().await {
            warn!("Failed to close connection: {}", e);
        }
        Ok(())
    }

    /// Handles one line of input. Errors are rendered, never returned.
    pub async fn handle_input(&mut self, input: &str) -> InputResult {
        let input = input.trim();

        if input.is_empty() {
            return InputResult::None;
        }

        if input.starts_with('/') {
            return self.handle_command(input).await;
        }

        match self.session.ask(input).await {
            Ok(Some(reply)) => InputResult::Output(vec![format!("AI: {reply}")]),
            Ok(None) => InputResult::None,
            Err(e) => InputResult::Output(vec![format!("Error: {e}")]),
        }
    }

    async fn handle_command(&mut self, input: &str) -> InputResult {
        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let command = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim()).unwrap_or("");
        debug!(command = %command, "Shell command");

        match command.as_str() {
            "/connect" => self.handle_connect(args).await,
            "/schema" => match self.session.schema_text().await {
                Ok(schema) => InputResult::Output(vec![schema]),
                Err(e) => InputResult::Output(vec![format!("Error: {e}")]),
            },
            "/history" => InputResult::Output(
                self.session
                    .conversation()
                    .turns()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            ),
            "/usage" => InputResult::Output(vec![format!("Usage: {}", self.session.usage())]),
            "/help" => InputResult::Output(vec![HELP_TEXT.to_string()]),
            "/quit" | "/exit" => InputResult::Exit,
            _ => InputResult::Output(vec![format!(
                "Unknown command: {}. Type /help for available commands.",
                command
            )]),
        }
    }

    async fn handle_connect(&mut self, args: &str) -> InputResult {
        let config = if args.is_empty() {
            self.default_connection.clone()
        } else {
            match ConnectionConfig::from_shorthand(args) {
                Ok(mut config) => {
                    config.apply_env_defaults();
                    config
                }
                Err(e) => return InputResult::Output(vec![format!("Error: {e}")]),
            }
        };

        let result = self.session.connect(&config).await;
        let label = self.session.connection_label().map(str::to_string);
        match (result, label) {
            (Ok(()), Some(label)) => InputResult::Output(vec![format!("Connected to {label}")]),
            (Ok(()), None) => InputResult::None,
            (Err(e), Some(label)) => InputResult::Output(vec![
                format!("Connection failed: {e}"),
                format!("Still connected to {label}"),
            ]),
            (Err(e), None) => InputResult::Output(vec![format!("Connection failed: {e}")]),
        }
    }
}

fn io_error(e: std::io::Error) -> crate::error::ChatError {
    crate::error::ChatError::internal(format!("Terminal I/O failed: {e}"))
}

async fn write_prompt<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    writer.write_all(PROMPT.as_bytes()).await.map_err(io_error)?;
    writer.flush().await.map_err(io_error)
}

async fn write_lines<W: AsyncWrite + Unpin>(writer: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        writer.write_all(line.as_bytes()).await.map_err(io_error)?;
        writer.write_all(b"\n").await.map_err(io_error)?;
    }
    writer.flush().await.map_err(io_error)
}
