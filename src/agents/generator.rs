//! Generator agent: turns an accepted chunk into candidate Q&A pairs.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::agents::types::{Candidate, QaPair};
use crate::chunker::Chunk;
use crate::error::LlmError;
use crate::llm::{extract_embedded_object, GenerationRequest, LlmProvider, Message};
use crate::prompts::build_generation_prompt;

/// Configuration for the generation stage.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model used for generation calls.
    pub model: String,
    /// Target language of the generated pairs.
    pub language: String,
    /// Hard cap on candidates taken from a single chunk.
    pub max_pairs_per_chunk: usize,
    /// Sampling temperature for generation.
    pub temperature: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            language: "Bahasa Melayu".to_string(),
            max_pairs_per_chunk: 10,
            temperature: 0.2,
        }
    }
}

/// Raw pair shape as emitted by the model. The source field is ignored;
/// the chunk's own source always wins.
#[derive(Debug, Deserialize)]
struct RawPair {
    question: String,
    answer: String,
}

/// Result of one generation call.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Successfully parsed candidates, in response order.
    pub candidates: Vec<Candidate>,
    /// Response lines that were discarded as unparseable or incomplete.
    pub discarded_lines: usize,
}

/// The generation agent.
pub struct GeneratorAgent {
    config: GeneratorConfig,
    llm: Arc<dyn LlmProvider>,
}

impl GeneratorAgent {
    /// Creates a generator backed by the given provider.
    pub fn new(config: GeneratorConfig, llm: Arc<dyn LlmProvider>) -> Self {
        Self { config, llm }
    }

    /// Generates candidate pairs for one chunk.
    ///
    /// The model is asked for JSONL output; each line is parsed
    /// independently and unparseable lines are discarded with a warning, so
    /// one malformed line never costs the whole chunk. An empty but
    /// well-formed response yields an empty vector.
    ///
    /// `per_chunk_cap` overrides the configured cap when smaller, so the
    /// orchestrator can shrink requests as the run approaches its target.
    ///
    /// # Errors
    ///
    /// Propagates transport and API errors from the provider; the caller
    /// skips the chunk and counts it as failed.
    pub async fn generate_for_chunk(
        &self,
        chunk: &Chunk,
        per_chunk_cap: usize,
    ) -> Result<GenerationOutcome, LlmError> {
        let cap = per_chunk_cap.min(self.config.max_pairs_per_chunk).max(1);
        let prompt = build_generation_prompt(&chunk.text, &chunk.source, &self.config.language, cap);
        let request = GenerationRequest::new(
            self.config.model.clone(),
            vec![Message::system(prompt.system), Message::user(prompt.user)],
        )
        .with_temperature(self.config.temperature);

        let response = self.llm.generate(request).await?;
        let content = response.first_content().ok_or(LlmError::EmptyCompletion)?;

        let outcome = self.parse_jsonl(content, chunk, cap);
        debug!(
            source = %chunk.source,
            index = chunk.index,
            candidates = outcome.candidates.len(),
            discarded = outcome.discarded_lines,
            "generation complete"
        );
        Ok(outcome)
    }

    /// Parses the model output as JSONL, one candidate per line.
    fn parse_jsonl(&self, content: &str, chunk: &Chunk, cap: usize) -> GenerationOutcome {
        let mut candidates = Vec::new();
        let mut discarded_lines = 0;

        for line in content.lines() {
            if candidates.len() >= cap {
                break;
            }
            let line = line.trim();
            if line.is_empty() || line.starts_with("```") {
                continue;
            }

            let raw = match serde_json::from_str::<RawPair>(line) {
                Ok(raw) => Some(raw),
                // Prose around the object: retry on the embedded {...}.
                Err(_) => extract_embedded_object(line)
                    .and_then(|json| serde_json::from_str::<RawPair>(&json).ok()),
            };

            match raw {
                Some(raw) if !raw.question.trim().is_empty() && !raw.answer.trim().is_empty() => {
                    candidates.push(Candidate {
                        pair: QaPair::new(
                            raw.question.trim(),
                            raw.answer.trim(),
                            chunk.source.clone(),
                        ),
                        chunk_index: chunk.index,
                    });
                }
                Some(_) => {
                    discarded_lines += 1;
                    warn!(source = %chunk.source, index = chunk.index, "discarding pair with empty field");
                }
                None => {
                    discarded_lines += 1;
                    warn!(
                        source = %chunk.source,
                        index = chunk.index,
                        line = %truncate_for_log(line),
                        "discarding unparseable generation line"
                    );
                }
            }
        }

        GenerationOutcome {
            candidates,
            discarded_lines,
        }
    }
}

fn truncate_for_log(line: &str) -> &str {
    let end = line
        .char_indices()
        .nth(80)
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}
