//! SQLite database client implementation.
//!
//! Useful for local files and for exercising the full chat pipeline against
//! an in-memory database.

use crate::config::ConnectionConfig;
use crate::db::{
    Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value,
    MAX_ROWS, QUERY_TIMEOUT_SECS, SAMPLE_ROWS_PER_TABLE,
};
use crate::error::{ChatError, ConnectionFailure, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the configured database file, or a private in-memory database.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        debug!("Opening {}", config.display_string());

        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| ChatError::connection(format!("Invalid SQLite location: {e}")))?;

        // An in-memory database lives and dies with its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                ChatError::connection_failure(
                    ConnectionFailure::Unreachable,
                    format!("Cannot open SQLite database: {e}"),
                )
            })?;

        Ok(Self { pool })
    }

    /// Opens an empty in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&ConnectionConfig::from_connection_string("sqlite::memory:")?).await
    }

    /// Runs a multi-statement script, e.g. a seed file.
    pub async fn run_script(&self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| ChatError::query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::query(format!("Failed to fetch tables: {e}")))?;

        let mut schema = Schema::new();
        for name in table_names {
            let (columns, primary_key) = self.fetch_columns(&name).await?;
            let mut foreign_keys = self.fetch_foreign_keys(&name).await?;
            let sample_rows = self.fetch_sample_rows(&name).await;

            schema.foreign_keys.append(&mut foreign_keys);
            schema.tables.push(Table {
                name,
                columns,
                primary_key,
                sample_rows,
            });
        }

        Ok(schema)
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
        .map_err(|e| ChatError::query(e.to_string()))?;

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

impl SqliteClient {
    /// Returns the table's columns and its primary key columns in key order.
    async fn fetch_columns(&self, table_name: &str) -> Result<(Vec<Column>, Vec<String>)> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table_name)))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                ChatError::query(format!("Failed to fetch columns for {table_name}: {e}"))
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        let mut key_parts: Vec<(i64, String)> = Vec::new();

        for row in rows {
            let name: String = row.try_get("name").map_err(|e| ChatError::query(e.to_string()))?;
            let data_type: String = row.try_get("type").unwrap_or_default();
            let not_null: i64 = row.try_get("notnull").unwrap_or(0);
            let default: Option<String> = row.try_get("dflt_value").unwrap_or(None);
            let pk: i64 = row.try_get("pk").unwrap_or(0);

            if pk > 0 {
                key_parts.push((pk, name.clone()));
            }
            columns.push(Column {
                name,
                data_type,
                is_nullable: not_null == 0,
                default,
            });
        }

        key_parts.sort();
        let primary_key = key_parts.into_iter().map(|(_, name)| name).collect();
        Ok((columns, primary_key))
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(&format!(
            "PRAGMA foreign_key_list({})",
            quote_ident(table_name)
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            ChatError::query(format!("Failed to fetch foreign keys for {table_name}: {e}"))
        })?;

        let mut keys: Vec<(i64, ForeignKey)> = Vec::new();
        for row in rows {
            let id: i64 = row.try_get("id").unwrap_or(0);
            let to_table: String = row.try_get("table").unwrap_or_default();
            let from: String = row.try_get("from").unwrap_or_default();
            let to: Option<String> = row.try_get("to").unwrap_or(None);

            let position = match keys.iter().position(|(key_id, _)| *key_id == id) {
                Some(position) => position,
                None => {
                    keys.push((
                        id,
                        ForeignKey::new(table_name, Vec::new(), to_table, Vec::new()),
                    ));
                    keys.len() - 1
                }
            };
            let fk = &mut keys[position].1;
            fk.from_columns.push(from);
            fk.to_columns.push(to.unwrap_or_default());
        }

        Ok(keys.into_iter().map(|(_, fk)| fk).collect())
    }

    async fn fetch_sample_rows(&self, table_name: &str) -> Vec<Row> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_ident(table_name),
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
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let declared = col.type_info();
            if declared.is_null() {
                // Expression columns have no declared type; use the value's storage class.
                let runtime = row
                    .try_get_raw(i)
                    .map(|raw| raw.type_info().name().to_string())
                    .unwrap_or_else(|_| "NULL".to_string());
                convert_value(row, i, &runtime)
            } else {
                convert_value(row, i, declared.name())
            }
        })
        .collect()
}

/// Converts a value by type name, falling back to text.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "NULL" => Value::Null,
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INTEGER" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .or_else(|| {
                row.try_get::<Option<i64>, _>(index)
                    .ok()
                    .flatten()
                    .map(Value::Int)
            })
            .or_else(|| {
                row.try_get::<Option<f64>, _>(index)
                    .ok()
                    .flatten()
                    .map(Value::Float)
            })
            .unwrap_or(Value::Null),
    }
}
