//! qna-forge: Question-Answer dataset generator for text corpora.
//!
//! This library turns plain-text documents into validated Q&A pairs in a
//! target language by chaining three LLM round trips (pre-filter, generate,
//! review) with word-window chunking, similarity-based deduplication and
//! CSV/JSONL export.

// Core modules
pub mod agents;
pub mod chunker;
pub mod cli;
pub mod dedup;
pub mod error;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod prefilter;
pub mod prompts;
pub mod sources;

// Re-export commonly used error types
pub use error::{ExportError, LlmError};
pub use pipeline::config::ConfigError;
