//! LLM integration for qna-forge.
//!
//! Provides a client for any OpenAI-compatible chat-completion endpoint,
//! plus helpers for pulling structured JSON out of noisy model output.
//! The pipeline stages (pre-filter, generator, reviewer) only depend on the
//! [`LlmProvider`] trait, so tests can substitute scripted providers.

pub mod client;
pub mod extract;

pub use client::{
    Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, OpenAiClient, Usage,
};
pub use extract::{extract_embedded_object, find_matching_brace};
