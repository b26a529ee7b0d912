//! Integration tests for sqlchat.
//!
//! The chat flow runs against in-memory SQLite with the scripted mock model,
//! so no network access is needed. MySQL tests run only when
//! MYSQL_TEST_DATABASE_URL is set.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
