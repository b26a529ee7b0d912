//! Database connector for sqlchat.
//!
//! Provides a trait-based interface over the supported backends plus the two
//! operations the chat pipeline relies on: a fresh schema snapshot and an
//! execution call that never fails.

mod mock;
mod mysql;
mod schema;
mod sqlite;
mod types;

pub use mock::MockDatabaseClient;
pub use mysql::MySqlClient;
pub use schema::{Column, ForeignKey, Schema, Table, SAMPLE_ROWS_PER_TABLE};
pub use sqlite::SqliteClient;
pub use types::{format_row_tuple, ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;

/// Query timeout in seconds.
pub(crate) const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
pub(crate) const MAX_ROWS: usize = 1000;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    MySql,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend (0 when not networked).
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::Sqlite => 0,
        }
    }
}

/// Creates a database client for the configured backend.
///
/// Any network, authentication or driver failure is reported as
/// `ChatError::Connection`. No retries are made.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::MySql => Ok(Box::new(MySqlClient::connect(config).await?)),
        DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(config).await?)),
    }
}

/// Trait defining the interface for database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, including a few sample rows per table.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Outcome of running generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The statement ran and produced a (possibly empty) payload.
    Rows(QueryResult),
    /// The statement failed. The reason is kept for callers and logs only.
    Failed { reason: String },
}

impl ExecutionOutcome {
    /// Sentinel text substituted into prompts for a failed execution.
    pub const NO_RESULT: &'static str = "None";

    /// Returns true if execution failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Text handed to the model as the SQL response.
    ///
    /// A payload cut at the row cap is followed by a note giving the shown
    /// and total row counts.
    pub fn to_prompt_text(&self) -> String {
        match self {
            Self::Rows(result) if result.was_truncated => format!(
                "{} (truncated: showing the first {} of {} rows)",
                result.to_result_text(),
                result.row_count,
                result.total_rows
            ),
            Self::Rows(result) => result.to_result_text(),
            Self::Failed { .. } => Self::NO_RESULT.to_string(),
        }
    }
}

/// Renders a fresh schema snapshot. Never cached.
pub async fn get_schema(db: &dyn DatabaseClient) -> Result<String> {
    let schema = db.introspect_schema().await?;
    Ok(schema.format_for_llm())
}

/// Runs arbitrary SQL text. Any failure becomes `ExecutionOutcome::Failed`.
pub async fn execute(db: &dyn DatabaseClient, sql: &str) -> ExecutionOutcome {
    match db.execute_query(sql).await {
        Ok(result) => {
            debug!(rows = result.row_count, "Generated SQL executed");
            ExecutionOutcome::Rows(result)
        }
        Err(e) => {
            debug!(error = %e, "Generated SQL failed, substituting no-result sentinel");
            ExecutionOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
