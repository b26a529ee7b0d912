//! sqlchat - chat with your database through a language model.
//!
//! This library exposes the core modules for use in integration tests.

pub mod chain;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod orchestrator;
pub mod session;
pub mod shell;
