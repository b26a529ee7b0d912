//! Database connector tests against SQLite.

use super::users_db;
use sqlchat::config::ConnectionConfig;
use sqlchat::db::{self, DatabaseBackend, DatabaseClient, ExecutionOutcome, Value};
use sqlchat::error::ChatError;

#[tokio::test]
async fn test_connect_memory_database() {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    assert_eq!(config.backend, DatabaseBackend::Sqlite);

    let client = db::connect(&config).await.unwrap();
    let result = client.execute_query("SELECT 1 AS one").await.unwrap();
    assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_schema_is_fresh_on_every_call() {
    let client = users_db().await;
    let before = db::get_schema(&client).await.unwrap();
    assert!(!before.contains("Table: orders"));

    client
        .run_script(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id));",
        )
        .await
        .unwrap();

    let after = db::get_schema(&client).await.unwrap();
    assert!(after.contains("Table: orders"));
    assert!(after.contains("  - user_id: INTEGER (FK -> users.id)"));
    assert!(after.contains("Foreign Keys:\n  - orders.user_id -> users.id"));
}

#[tokio::test]
async fn test_execute_never_fails() {
    let client = users_db().await;

    let outcome = db::execute(&client, "this is not sql at all").await;
    assert!(outcome.is_failed());
    assert_eq!(outcome.to_prompt_text(), "None");

    let outcome = db::execute(&client, "SELECT id, name FROM users WHERE id > 1 ORDER BY id").await;
    assert_eq!(outcome.to_prompt_text(), "[(2, 'Bob'), (3, 'Carol')]");
}

#[tokio::test]
async fn test_execute_empty_result() {
    let client = users_db().await;
    let outcome = db::execute(&client, "SELECT * FROM users WHERE id = 99").await;

    match outcome {
        ExecutionOutcome::Rows(result) => {
            assert!(result.is_empty());
            assert_eq!(result.to_result_text(), "[]");
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[tokio::test]
async fn test_row_cap_is_reported_to_the_model() {
    let client = users_db().await;
    let sql = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 1500) \
               SELECT x FROM n";

    let outcome = db::execute(&client, sql).await;

    match &outcome {
        ExecutionOutcome::Rows(result) => {
            assert!(result.was_truncated);
            assert_eq!(result.rows.len(), 1000);
            assert_eq!(result.total_rows, 1500);
        }
        other => panic!("expected rows, got {other:?}"),
    }
    assert!(outcome
        .to_prompt_text()
        .ends_with("(1000,)] (truncated: showing the first 1000 of 1500 rows)"));
}

#[tokio::test]
async fn test_null_and_float_rendering() {
    let client = users_db().await;
    let result = client
        .execute_query("SELECT NULL AS nothing, 2.5 AS ratio, 'it''s' AS quoted")
        .await
        .unwrap();
    assert_eq!(result.to_result_text(), "[(None, 2.5, \"it's\")]");
}

#[tokio::test]
async fn test_unknown_backend_scheme_is_config_error() {
    let err = ConnectionConfig::from_connection_string("postgres://localhost/app").unwrap_err();
    assert!(matches!(err, ChatError::Config(_)));
}
