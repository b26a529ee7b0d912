//! Prompt templates for the three chains.
//!
//! Placeholders are `{name}`. The wording is the contract with the model:
//! the response template asks for two fixed phrases, and the orchestrator
//! matches one of them verbatim.

use super::PromptTemplate;

/// Sentence the response chain is told to produce for out-of-domain questions.
pub const UNRELATED_MARKER: &str = "Your question is unrelated to the information on the database.";

/// Sentence the response chain is told to produce when the SQL was unusable.
pub const RETRY_PHRASE: &str =
    "Could not get any information at this time, can you please ask again?";

/// Question + schema + history -> SQL text.
pub const SQL_QUERY_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "Based on the table schema below, write only a SQL query that would answer the user's question and your answer should be in text without putting it in SQL editor:
{schema}

Question: {question}
{chat_history}
",
);

/// Schema + history + question + SQL + execution result -> prose answer.
pub const RESPONSE_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "Based on the table schema below, question, sql query, and sql response, write a natural language response:
Here are a few things to take note of:
No.1. If the SQL query is incorrect or in a format that is incorrect, reply by saying \"Could not get any information at this time, can you please ask again?\"
No.2. If the user question is not related to what is in the database, respond by saying \"Your question is unrelated to the information on the database. After this, then go global and answer the question.\"
{schema}

{chat_history}
Question: {question}
SQL Query: {query}
SQL Response: {response}
",
);

/// Question only. No schema, no history.
pub const GLOBAL_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "The user has asked a question: {question}
Provide a comprehensive answer.
",
);
