//! Mock database client for testing.
//!
//! Returns a fixed schema and canned results keyed by SQL substrings.

use super::{DatabaseClient, QueryResult, Schema};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    results: Vec<(String, QueryResult)>,
    failure: Option<String>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Default::default()
        }
    }

    /// Creates a client whose every query fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Returns `result` for any SQL containing `pattern` (case-insensitive).
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.results.push((pattern.into().to_lowercase(), result));
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        if let Some(reason) = &self.failure {
            return Err(ChatError::query(reason.clone()));
        }

        let sql_lower = sql.to_lowercase();
        if let Some((_, result)) = self
            .results
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
        {
            return Ok(result.clone());
        }

        if sql_lower.trim_start().starts_with("select") {
            Ok(QueryResult::new())
        } else {
            Err(ChatError::query(format!("Mock cannot execute: {sql}")))
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, Value};

    #[tokio::test]
    async fn test_mock_canned_result() {
        let client = MockDatabaseClient::new().with_result(
            "FROM users",
            QueryResult::with_data(vec![ColumnInfo::new("n", "BIGINT")], vec![vec![Value::Int(2)]]),
        );
        let result = client
            .execute_query("select count(*) as n from users")
            .await
            .unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(client.executed(), vec!["select count(*) as n from users"]);
    }

    #[tokio::test]
    async fn test_mock_unknown_select_is_empty() {
        let client = MockDatabaseClient::new();
        let result = client.execute_query("SELECT 1").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_mock_rejects_non_select() {
        let client = MockDatabaseClient::new();
        assert!(client.execute_query("DROP TABLE users").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let client = MockDatabaseClient::failing("Table 'sample.nope' doesn't exist");
        let err = client.execute_query("SELECT * FROM nope").await.unwrap_err();
        assert!(matches!(err, ChatError::Query(_)));
    }
}
