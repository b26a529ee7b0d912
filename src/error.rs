//! Error types for sqlchat.
//!
//! Query execution failures on the chat path never surface through this type:
//! they are folded into `db::ExecutionOutcome::Failed` by the connector.

use thiserror::Error;

/// Why a database handle could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// Server or file could not be reached.
    Unreachable,
    /// Credentials were rejected.
    AccessDenied,
    /// Server is up but the database does not exist.
    UnknownDatabase,
    /// TLS negotiation failed.
    Tls,
    TimedOut,
    /// No connection has been opened yet.
    NotConnected,
    Other,
}

impl ConnectionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::AccessDenied => "access_denied",
            Self::UnknownDatabase => "unknown_database",
            Self::Tls => "tls",
            Self::TimedOut => "timed_out",
            Self::NotConnected => "not_connected",
            Self::Other => "other",
        }
    }
}

/// Main error type for sqlchat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Database connection errors, classified by `kind`.
    #[error("Connection error: {message}")]
    Connection {
        kind: ConnectionFailure,
        message: String,
    },

    /// Query and introspection errors raised by a database driver.
    #[error("Query error: {0}")]
    Query(String),

    /// Language-model service errors (auth, rate limits, timeouts, bad payloads).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, template bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Creates an unclassified connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::connection_failure(ConnectionFailure::Other, msg)
    }

    /// Creates a connection error of a known kind.
    pub fn connection_failure(kind: ConnectionFailure, msg: impl Into<String>) -> Self {
        Self::Connection {
            kind,
            message: msg.into(),
        }
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Kind of a connection error, `None` for every other category.
    pub fn connection_kind(&self) -> Option<ConnectionFailure> {
        match self {
            Self::Connection { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type alias using ChatError.
pub type Result<T> = std::result::Result<T, ChatError>;
