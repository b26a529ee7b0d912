//! Integration tests for sqlchat.

pub mod chat_flow_test;
pub mod connector_test;
pub mod mysql_test;

use sqlchat::config::ChatConfig;
use sqlchat::db::SqliteClient;
use sqlchat::llm::MockLlmClient;
use sqlchat::orchestrator::ResponseOrchestrator;
use sqlchat::session::Session;

/// Seed for the `users(id, name)` database used throughout.
pub const USERS_SEED: &str = r#"
CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Carol');
"#;

/// In-memory database holding three users.
pub async fn users_db() -> SqliteClient {
    let client = SqliteClient::in_memory().await.unwrap();
    client.run_script(USERS_SEED).await.unwrap();
    client
}

/// Session over `users_db()` whose model is `llm` (clones share call records).
pub async fn connected_session(llm: &MockLlmClient) -> Session {
    let mut session = Session::new(
        ResponseOrchestrator::new(Box::new(llm.clone())),
        &ChatConfig::default(),
    );
    session.attach(Box::new(users_db().await), "sqlite :memory:").await;
    session
}
