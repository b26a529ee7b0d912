//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient`
//! trait for MySQL and MariaDB servers using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{
    Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value,
    MAX_ROWS, QUERY_TIMEOUT_SECS, SAMPLE_ROWS_PER_TABLE,
};
use crate::error::{ChatError, ConnectionFailure, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Connects to the configured server. Fails once, without retrying.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        debug!("Connecting to {}", config.display_string());

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys().await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            ChatError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| ChatError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows,
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

impl MySqlClient {
    /// Fetches all base tables of the current database.
    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT CAST(table_name AS CHAR)
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::query(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for table_name in table_names {
            let columns = self.fetch_columns(&table_name).await?;
            let primary_key = self.fetch_primary_key(&table_name).await?;
            let sample_rows = self.fetch_sample_rows(&table_name).await;

            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
                sample_rows,
            });
        }

        Ok(tables)
    }

    /// Fetches columns for a specific table.
    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                CAST(column_name AS CHAR),
                CAST(column_type AS CHAR),
                CAST(is_nullable AS CHAR),
                CAST(column_default AS CHAR)
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            ChatError::query(format!("Failed to fetch columns for {table_name}: {e}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default)| Column {
                name,
                data_type,
                is_nullable: is_nullable == "YES",
                default,
            })
            .collect())
    }

    /// Fetches primary key columns for a specific table.
    async fn fetch_primary_key(&self, table_name: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT CAST(column_name AS CHAR)
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
                AND table_name = ?
                AND constraint_name = 'PRIMARY'
            ORDER BY ordinal_position
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            ChatError::query(format!("Failed to fetch primary key for {table_name}: {e}"))
        })
    }

    /// Fetches a few rows to show the model what the data looks like.
    ///
    /// Failures here only cost context, so they are logged and skipped.
    async fn fetch_sample_rows(&self, table_name: &str) -> Vec<Row> {
        let sql = format!(
            "SELECT * FROM `{}` LIMIT {}",
            table_name.replace('`', "``"),
            SAMPLE_ROWS_PER_TABLE
        );
        match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows.iter().map(convert_row).collect(),
            Err(e) => {
                warn!("Could not sample rows from {}: {}", table_name, e);
                Vec::new()
            }
        }
    }

    /// Fetches all foreign key relationships, grouped by constraint.
    async fn fetch_foreign_keys(&self) -> Result<Vec<ForeignKey>> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(constraint_name AS CHAR),
                CAST(table_name AS CHAR),
                CAST(column_name AS CHAR),
                CAST(referenced_table_name AS CHAR),
                CAST(referenced_column_name AS CHAR)
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
                AND referenced_table_name IS NOT NULL
            ORDER BY table_name, constraint_name, ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::query(format!("Failed to fetch foreign keys: {e}")))?;

        let mut order: Vec<(String, String)> = Vec::new();
        let mut fk_map: HashMap<(String, String), ForeignKey> = HashMap::new();

        for (constraint, from_table, from_column, to_table, to_column) in rows {
            let key = (from_table.clone(), constraint);
            let entry = fk_map.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                ForeignKey::new(from_table, Vec::new(), to_table, Vec::new())
            });
            entry.from_columns.push(from_column);
            entry.to_columns.push(to_column);
        }

        Ok(order
            .into_iter()
            .filter_map(|key| fk_map.remove(&key))
            .collect())
    }
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let type_name = type_name.to_uppercase();

    match type_name.as_str() {
        "NULL" => Value::Null,

        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        t if t.contains("INT") && t.contains("UNSIGNED") => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| match i64::try_from(v) {
                Ok(v) => Value::Int(v),
                Err(_) => Value::String(v.to_string()),
            })
            .unwrap_or(Value::Null),

        t if t.contains("INT") => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        // DECIMAL travels as text on the wire; no numeric crate needed.
        "DECIMAL" => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .or_else(|| {
                row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
                    .ok()
                    .flatten()
                    .map(|v| Value::String(v.to_string()))
            })
            .unwrap_or(Value::Null),

        t if t.contains("BLOB") || t.contains("BINARY") || t == "BIT" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            })
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// MySQL server error numbers seen while opening a connection.
const ER_DBACCESS_DENIED: u16 = 1044;
const ER_ACCESS_DENIED: u16 = 1045;
const ER_BAD_DB: u16 = 1049;

/// Classifies a sqlx connection error by variant and server error number.
fn classify_connection_error(error: &sqlx::Error) -> ConnectionFailure {
    match error {
        sqlx::Error::Io(io) if io.kind() == ErrorKind::TimedOut => ConnectionFailure::TimedOut,
        sqlx::Error::Io(_) => ConnectionFailure::Unreachable,
        sqlx::Error::Tls(_) => ConnectionFailure::Tls,
        sqlx::Error::PoolTimedOut => ConnectionFailure::TimedOut,
        sqlx::Error::Database(db_error) => {
            match db_error.try_downcast_ref::<MySqlDatabaseError>().map(|e| e.number()) {
                Some(ER_ACCESS_DENIED | ER_DBACCESS_DENIED) => ConnectionFailure::AccessDenied,
                Some(ER_BAD_DB) => ConnectionFailure::UnknownDatabase,
                _ => ConnectionFailure::Other,
            }
        }
        _ => ConnectionFailure::Other,
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ChatError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.effective_port();
    let kind = classify_connection_error(&error);

    let message = match kind {
        ConnectionFailure::Unreachable => {
            format!("Cannot connect to {host}:{port}. Check that the server is running.")
        }
        ConnectionFailure::AccessDenied => format!(
            "Access denied for user '{}'. Check your credentials.",
            config.user.as_deref().unwrap_or("unknown")
        ),
        ConnectionFailure::UnknownDatabase => format!(
            "Database '{}' does not exist.",
            config.database.as_deref().unwrap_or("unknown")
        ),
        ConnectionFailure::Tls => "TLS negotiation failed. Try adding '?ssl-mode=disabled' \
             to the connection string or setting ssl_mode in the config file."
            .to_string(),
        ConnectionFailure::TimedOut => format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ),
        ConnectionFailure::NotConnected | ConnectionFailure::Other => error.to_string(),
    };

    debug!(kind = kind.as_str(), "Connection failed: {}", error);
    ChatError::connection_failure(kind, message)
}

/// Formats a query error, keeping the server's error code when there is one.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("ERROR {}: {}", code, db_error.message()),
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
