//! Error types for qna-forge operations.
//!
//! Defines error types for the major subsystems:
//! - LLM API interactions (transport, API status, response parsing)
//! - Dataset export (CSV, JSONL)
//!
//! Configuration errors live next to the configuration itself in
//! `pipeline::config`; pipeline-level errors in `pipeline::orchestrator`.

use thiserror::Error;

/// Errors that can occur during LLM operations.
///
/// These are local to a single call: the orchestrator treats a failed
/// generation as a skipped chunk and a failed review as a dropped
/// candidate, never as a run-terminating condition.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Missing API base URL: OPENAI_BASE_URL environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Empty completion: response contained no choices")]
    EmptyCompletion,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while writing the final dataset.
///
/// Unlike per-call LLM failures, a sink-write failure terminates the run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
