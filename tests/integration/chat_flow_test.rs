//! End-to-end chat flow tests.
//!
//! Drive a `Session` over a real SQLite database with the mock model.

use super::{connected_session, USERS_SEED};
use pretty_assertions::assert_eq;
use sqlchat::config::{ChatConfig, ConnectionConfig};
use sqlchat::conversation::{Speaker, DEFAULT_GREETING};
use sqlchat::db::{ExecutionOutcome, SqliteClient};
use sqlchat::error::ConnectionFailure;
use sqlchat::llm::MockLlmClient;
use sqlchat::orchestrator::{ResponseOrchestrator, UNRELATED_MARKER};
use sqlchat::session::{Session, NOT_CONNECTED_MESSAGE};

#[tokio::test]
async fn test_count_question_runs_generated_sql() {
    let llm = MockLlmClient::new();
    let mut session = connected_session(&llm).await;

    let reply = session
        .ask("how many users are there?")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reply, "The query returned: [(3,)]");
    let answer = session.last_answer().unwrap();
    assert_eq!(answer.sql, "SELECT COUNT(*) FROM users");
    assert!(!answer.used_fallback);
    match &answer.execution {
        ExecutionOutcome::Rows(result) => assert_eq!(result.to_result_text(), "[(3,)]"),
        other => panic!("expected rows, got {other:?}"),
    }
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_schema_prompt_carries_columns_and_sample_rows() {
    let llm = MockLlmClient::new()
        .with_response("SELECT name FROM users ORDER BY id")
        .with_response("The users are Alice, Bob and Carol.");
    let mut session = connected_session(&llm).await;

    session.ask("who are the users?").await.unwrap();

    let prompts = llm.prompts();
    assert!(prompts[0].contains("Table: users"));
    assert!(prompts[0].contains("  - id: INTEGER (PK)"));
    assert!(prompts[0].contains("  - name: TEXT (NOT NULL)"));
    assert!(prompts[0].contains("(1, 'Alice')"));
    assert!(prompts[1].contains("SQL Response: [('Alice',), ('Bob',), ('Carol',)]"));
}

#[tokio::test]
async fn test_unrelated_question_falls_back_to_global_answer() {
    let llm = MockLlmClient::new()
        .with_response("SELECT NULL")
        .with_response(format!(
            "{UNRELATED_MARKER} After this, then go global and answer the question."
        ))
        .with_response("The capital of France is Paris.");
    let mut session = connected_session(&llm).await;

    let reply = session
        .ask("What's the capital of France?")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reply, "The capital of France is Paris.");
    assert!(session.last_answer().unwrap().used_fallback);
    assert_eq!(llm.call_count(), 3);

    // The discarded candidate never reaches the log.
    let turns = session.conversation().turns();
    assert_eq!(turns.last().unwrap().text(), "The capital of France is Paris.");
    assert!(turns.iter().all(|t| !t.text().contains(UNRELATED_MARKER)));
}

#[tokio::test]
async fn test_unrelated_question_with_heuristic_model() {
    let llm = MockLlmClient::new();
    let mut session = connected_session(&llm).await;

    let reply = session
        .ask("What is the capital of France?")
        .await
        .unwrap()
        .unwrap();

    assert!(session.last_answer().unwrap().used_fallback);
    assert!(reply.contains("What is the capital of France?"));
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_candidate_without_marker_is_final() {
    let candidate = "There are three users: Alice, Bob and Carol.";
    let llm = MockLlmClient::new()
        .with_response("SELECT name FROM users")
        .with_response(candidate);
    let mut session = connected_session(&llm).await;

    let reply = session.ask("list the users").await.unwrap().unwrap();

    assert_eq!(reply, candidate);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_failed_execution_is_sent_as_none() {
    let llm = MockLlmClient::new()
        .with_response("SELECT * FROM customers")
        .with_response("Could not get any information at this time, can you please ask again?");
    let mut session = connected_session(&llm).await;

    let reply = session.ask("list the customers").await.unwrap().unwrap();

    assert_eq!(
        reply,
        "Could not get any information at this time, can you please ask again?"
    );
    let answer = session.last_answer().unwrap();
    match &answer.execution {
        ExecutionOutcome::Failed { reason } => assert!(reason.contains("customers")),
        other => panic!("expected failure, got {other:?}"),
    }
    let response_prompt = &llm.prompts()[1];
    assert!(response_prompt.contains("SQL Query: SELECT * FROM customers\nSQL Response: None\n"));
    assert!(!response_prompt.contains("no such table"));
}

#[tokio::test]
async fn test_question_before_connect_invokes_nothing() {
    let llm = MockLlmClient::new();
    let mut session = Session::new(
        ResponseOrchestrator::new(Box::new(llm.clone())),
        &ChatConfig::default(),
    );

    let reply = session.ask("how many users are there?").await.unwrap();

    assert_eq!(reply.as_deref(), Some(NOT_CONNECTED_MESSAGE));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_failed_connect_blocks_queries() {
    let llm = MockLlmClient::new();
    let mut session = Session::new(
        ResponseOrchestrator::new(Box::new(llm.clone())),
        &ChatConfig::default(),
    );
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir").join("shop.db");
    let config =
        ConnectionConfig::from_connection_string(&format!("sqlite://{}", missing.display()))
            .unwrap();

    let err = session.connect(&config).await.unwrap_err();

    assert_eq!(err.connection_kind(), Some(ConnectionFailure::Unreachable));
    assert!(!session.is_connected());
    let reply = session.ask("how many users are there?").await.unwrap();
    assert_eq!(reply.as_deref(), Some(NOT_CONNECTED_MESSAGE));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_connect_to_sqlite_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config =
        ConnectionConfig::from_connection_string(&format!("sqlite://{}", file.path().display()))
            .unwrap();
    let seeder = SqliteClient::connect(&config).await.unwrap();
    seeder.run_script(USERS_SEED).await.unwrap();
    sqlchat::db::DatabaseClient::close(&seeder).await.unwrap();

    let llm = MockLlmClient::new();
    let mut session = Session::new(
        ResponseOrchestrator::new(Box::new(llm.clone())),
        &ChatConfig::default(),
    );
    session.connect(&config).await.unwrap();

    let reply = session.ask("How many users?").await.unwrap().unwrap();
    assert_eq!(reply, "The query returned: [(3,)]");
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_conversation_log_is_append_only() {
    let llm = MockLlmClient::new();
    let mut session = connected_session(&llm).await;
    let questions = [
        "how many users are there?",
        "show me every user",
        "what is the capital of France?",
        "how many users are there?",
    ];

    let mut snapshots = Vec::new();
    for question in questions {
        session.ask(question).await.unwrap();
        snapshots.push(session.conversation().turns().to_vec());
    }

    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 1 + 2 * questions.len());
    for snapshot in &snapshots {
        assert_eq!(&turns[..snapshot.len()], snapshot.as_slice());
    }

    assert_eq!(turns[0].speaker(), Speaker::Ai);
    assert_eq!(turns[0].text(), DEFAULT_GREETING);
    for (i, question) in questions.iter().enumerate() {
        assert_eq!(turns[1 + 2 * i].speaker(), Speaker::Human);
        assert_eq!(turns[1 + 2 * i].text(), *question);
        assert_eq!(turns[2 + 2 * i].speaker(), Speaker::Ai);
    }
}

#[tokio::test]
async fn test_history_includes_current_question_and_earlier_turns() {
    let llm = MockLlmClient::new()
        .with_response("SELECT COUNT(*) FROM users")
        .with_response("There are 3 users.")
        .with_response("SELECT name FROM users")
        .with_response("Alice, Bob and Carol.");
    let mut session = connected_session(&llm).await;

    session.ask("how many users are there?").await.unwrap();
    session.ask("and their names?").await.unwrap();

    let second_sql_prompt = &llm.prompts()[2];
    assert!(second_sql_prompt.ends_with(
        "AI: Hello! I am an SQL assistant. Ask me anything about your database.\n\
         Human: how many users are there?\n\
         AI: There are 3 users.\n\
         Human: and their names?\n"
    ));
}
