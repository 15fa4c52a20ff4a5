//! Agent stages of the Q&A pipeline.
//!
//! Two LLM-backed agents operate per unit of work: the generator proposes
//! candidate pairs for an accepted chunk, the reviewer verifies each
//! candidate against its supporting text. Both depend only on the
//! [`crate::llm::LlmProvider`] seam.

pub mod generator;
pub mod reviewer;
pub mod types;

pub use generator::{GenerationOutcome, GeneratorAgent, GeneratorConfig};
pub use reviewer::{ReviewerAgent, ReviewerConfig};
pub use types::{Candidate, QaPair, ReviewVerdict};
