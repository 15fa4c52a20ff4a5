//! Pipeline orchestration.
//!
//! Chunks from all documents are processed concurrently through a bounded
//! worker pool. Each chunk task runs pre-filter, generation and review,
//! then offers surviving pairs to the shared question bank, which enforces
//! the duplicate threshold and the run-wide pair target in one atomic step.
//! Per-chunk failures are isolated: a transport error skips that chunk and
//! the run continues. Final output is sorted by document and chunk
//! position, so two runs that accept the same pairs produce identical
//! files regardless of completion order.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::agents::reviewer::screen_pair;
use crate::agents::{
    GeneratorAgent, GeneratorConfig, QaPair, ReviewVerdict, ReviewerAgent, ReviewerConfig,
};
use crate::chunker::{Chunk, Chunker};
use crate::dedup::{AcceptOutcome, QuestionBank};
use crate::error::{ExportError, LlmError};
use crate::llm::LlmProvider;
use crate::pipeline::config::{ConfigError, PipelineConfig};
use crate::pipeline::stats::{RunStats, StatsReport};
use crate::prefilter::{strip_metadata_header, Decision, Prefilter, PrefilterConfig};
use crate::sources::{Document, SourceError};

/// Adaptive target tuning: one pair expected per this many corpus words.
const WORDS_PER_PAIR: usize = 40;

/// Adaptive target tuning: at most this many pairs credited per chunk.
const ADAPTIVE_PAIRS_PER_CHUNK: usize = 20;

/// Adaptive target bounds before the configured maximum applies.
const ADAPTIVE_MIN: usize = 50;
const ADAPTIVE_MAX: usize = 200;

/// Top-level pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Final pairs, ordered by (source, chunk index).
    pub pairs: Vec<QaPair>,
    /// Per-stage counters for the run.
    pub report: StatsReport,
}

/// An accepted pair together with its ordering key.
struct AcceptedPair {
    pair: QaPair,
    chunk_index: usize,
}

/// Shared state mutated by chunk tasks. One lock covers both the bank and
/// the accepted list so admission and collection cannot diverge.
struct BankState {
    bank: QuestionBank,
    accepted: Vec<AcceptedPair>,
}

/// The assembled pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    chunker: Chunker,
    prefilter: Prefilter,
    generator: GeneratorAgent,
    reviewer: ReviewerAgent,
    stats: RunStats,
}

impl Pipeline {
    /// Assembles a pipeline from a validated configuration and a provider.
    ///
    /// # Errors
    ///
    /// Returns the first configuration violation found.
    pub fn new(config: PipelineConfig, llm: Arc<dyn LlmProvider>) -> Result<Self, PipelineError> {
        config.validate()?;

        let prefilter_config = PrefilterConfig {
            min_words: config.min_chunk_words,
            model: config.review_model.clone(),
        };
        let prefilter = if config.llm_prefilter {
            Prefilter::with_llm(prefilter_config, Arc::clone(&llm))
        } else {
            Prefilter::new(prefilter_config)
        };

        let generator = GeneratorAgent::new(
            GeneratorConfig {
                model: config.gen_model.clone(),
                language: config.language.clone(),
                max_pairs_per_chunk: config.max_pairs_per_chunk,
                ..Default::default()
            },
            Arc::clone(&llm),
        );
        let reviewer = ReviewerAgent::new(
            ReviewerConfig {
                model: config.review_model.clone(),
                ..Default::default()
            },
            llm,
        );

        Ok(Self {
            chunker: Chunker::new(config.chunk_words, config.chunk_overlap),
            prefilter,
            generator,
            reviewer,
            stats: RunStats::new(),
            config,
        })
    }

    /// Runs the pipeline over the given documents.
    ///
    /// Never fails as a whole: configuration problems are caught in
    /// [`Pipeline::new`], and every per-chunk failure is counted and
    /// skipped. An empty document set produces an empty outcome.
    pub async fn run(&self, documents: &[Document]) -> RunOutcome {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut total_words = 0usize;
        for document in documents {
            let body = strip_metadata_header(&document.text);
            total_words += body.split_whitespace().count();
            chunks.extend(self.chunker.chunk(&body, &document.source));
        }
        RunStats::add(&self.stats.chunks_total, chunks.len() as u64);

        let target = if self.config.adaptive_target {
            adaptive_target(total_words, chunks.len(), self.config.max_pairs)
        } else {
            self.config.max_pairs
        };
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            target,
            workers = self.config.workers,
            "starting pipeline run"
        );

        let shared = Mutex::new(BankState {
            bank: QuestionBank::new(self.config.dup_threshold, target),
            accepted: Vec::new(),
        });

        stream::iter(chunks)
            .for_each_concurrent(self.config.workers, |chunk| {
                self.process_chunk(chunk, &shared)
            })
            .await;

        let state = shared.into_inner().unwrap_or_else(|e| e.into_inner());
        let mut accepted = state.accepted;
        accepted.sort_by(|a, b| {
            a.pair
                .source
                .cmp(&b.pair.source)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });

        RunStats::add(&self.stats.pairs_final, accepted.len() as u64);
        let report = self.stats.snapshot();
        info!(pairs = accepted.len(), "pipeline run complete");

        RunOutcome {
            pairs: accepted.into_iter().map(|a| a.pair).collect(),
            report,
        }
    }

    /// Processes one chunk end to end.
    async fn process_chunk(&self, chunk: Chunk, shared: &Mutex<BankState>) {
        let remaining = lock(shared).bank.remaining();
        if remaining == 0 {
            return;
        }

        if let Decision::Rejected(reason) = self.prefilter.evaluate(&chunk).await {
            RunStats::incr(&self.stats.chunks_rejected_prefilter);
            info!(source = %chunk.source, index = chunk.index, %reason, "chunk skipped");
            return;
        }

        let cap = self.config.max_pairs_per_chunk.min(remaining);
        let outcome = match self.generator.generate_for_chunk(&chunk, cap).await {
            Ok(outcome) => outcome,
            Err(err) => {
                RunStats::incr(&self.stats.chunks_failed);
                warn!(source = %chunk.source, index = chunk.index, error = %err, "generation failed, skipping chunk");
                return;
            }
        };
        RunStats::add(
            &self.stats.candidates_generated,
            outcome.candidates.len() as u64,
        );
        RunStats::add(&self.stats.parse_discards, outcome.discarded_lines as u64);

        for candidate in outcome.candidates {
            if lock(shared).bank.is_full() {
                break;
            }

            let verdict = if self.config.skip_review {
                screen_pair(&candidate.pair)
            } else {
                match self.reviewer.review(&candidate.pair, &chunk.text).await {
                    Ok(verdict) => verdict,
                    Err(err) => {
                        RunStats::incr(&self.stats.review_failed);
                        warn!(source = %chunk.source, index = chunk.index, error = %err, "review failed, dropping candidate");
                        continue;
                    }
                }
            };

            match &verdict {
                ReviewVerdict::Accept => RunStats::incr(&self.stats.review_accepted),
                ReviewVerdict::Edit { .. } => RunStats::incr(&self.stats.review_edited),
                ReviewVerdict::Reject { reason } => {
                    RunStats::incr(&self.stats.review_rejected);
                    info!(source = %chunk.source, index = chunk.index, %reason, "candidate rejected");
                }
            }

            let Some(pair) = verdict.apply(candidate.pair) else {
                continue;
            };

            let mut state = lock(shared);
            match state.bank.try_accept(&pair.question) {
                AcceptOutcome::Accepted => state.accepted.push(AcceptedPair {
                    pair,
                    chunk_index: candidate.chunk_index,
                }),
                AcceptOutcome::Duplicate => {
                    drop(state);
                    RunStats::incr(&self.stats.duplicates_rejected);
                }
                AcceptOutcome::Full => break,
            }
        }
    }
}

fn lock(shared: &Mutex<BankState>) -> MutexGuard<'_, BankState> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Derives the run target from corpus size.
///
/// One pair is budgeted per [`WORDS_PER_PAIR`] words, limited to
/// [`ADAPTIVE_PAIRS_PER_CHUNK`] per chunk, clamped to
/// `ADAPTIVE_MIN..=ADAPTIVE_MAX`, rounded down to a multiple of ten, and
/// finally capped by the configured maximum.
fn adaptive_target(total_words: usize, chunk_count: usize, max_pairs: usize) -> usize {
    let by_words = total_words / WORDS_PER_PAIR;
    let by_chunks = chunk_count.saturating_mul(ADAPTIVE_PAIRS_PER_CHUNK);
    let clamped = by_words.min(by_chunks).clamp(ADAPTIVE_MIN, ADAPTIVE_MAX);
    let rounded = clamped / 10 * 10;
    rounded.min(max_pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message};
    use async_trait::async_trait;

    /// Provider that answers generation and review prompts by role.
    ///
    /// Generation replies echo the first word of the chunk into the
    /// question, so tests can tie output pairs back to chunk positions.
    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            let system = &request.messages[0].content;
            let user = &request.messages[1].content;

            let reply = if system.contains("penjana") {
                let chunk_text = user
                    .split("Petikan teks:\n")
                    .nth(1)
                    .and_then(|t| t.split("\n\nArahan").next())
                    .unwrap_or("");
                let marker = chunk_text.split_whitespace().next().unwrap_or("kosong");
                format!(
                    r#"{{"question":"Apakah {marker}?","answer":"Jawapan tentang {marker}","source":""}}"#
                )
            } else {
                r#"{"status":"accept"}"#.to_string()
            };

            Ok(GenerationResponse {
                model: "test".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(reply),
                    finish_reason: Some("stop".to_string()),
                }],
                usage: None,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            Err(LlmError::RequestFailed("connection refused".to_string()))
        }
    }

    /// Malay filler so the language heuristic passes.
    const FILLER: &str = "dan yang di ke dari untuk dengan pada ini";

    fn document_with_markers(markers: &[&str]) -> Document {
        // Each marker starts a 10-word window when chunked at size 10.
        let text = markers
            .iter()
            .map(|m| format!("{} {}", m, FILLER))
            .collect::<Vec<_>>()
            .join(" ");
        Document {
            source: "doc.txt".to_string(),
            text,
        }
    }

    fn test_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.chunk_words = 10;
        config.chunk_overlap = 0;
        config.min_chunk_words = 5;
        config.max_pairs = 100;
        config.workers = 3;
        config
    }

    #[tokio::test]
    async fn test_end_to_end_order_is_deterministic() {
        let pipeline = Pipeline::new(test_config(), Arc::new(EchoProvider)).unwrap();
        let doc = document_with_markers(&["merdeka", "fotosintesis", "ekonomi"]);

        let outcome = pipeline.run(&[doc]).await;
        let questions: Vec<&str> = outcome.pairs.iter().map(|p| p.question.as_str()).collect();
        assert_eq!(
            questions,
            vec![
                "Apakah merdeka?",
                "Apakah fotosintesis?",
                "Apakah ekonomi?"
            ]
        );
        assert_eq!(outcome.report.chunks_total, 3);
        assert_eq!(outcome.report.review_accepted, 3);
        assert_eq!(outcome.report.pairs_final, 3);
        assert!(outcome.pairs.iter().all(|p| p.source == "doc.txt"));
    }

    #[tokio::test]
    async fn test_pair_target_stops_run() {
        let mut config = test_config();
        config.max_pairs = 2;
        let pipeline = Pipeline::new(config, Arc::new(EchoProvider)).unwrap();
        let doc = document_with_markers(&["satu", "dua", "tiga", "empat", "lima"]);

        let outcome = pipeline.run(&[doc]).await;
        assert_eq!(outcome.pairs.len(), 2);
        assert_eq!(outcome.report.pairs_final, 2);
    }

    #[tokio::test]
    async fn test_duplicate_questions_collapse() {
        let pipeline = Pipeline::new(test_config(), Arc::new(EchoProvider)).unwrap();
        // Both chunks start with the same marker word, producing the same
        // question twice.
        let doc = document_with_markers(&["merdeka", "merdeka"]);

        let outcome = pipeline.run(&[doc]).await;
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.report.duplicates_rejected, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_isolated_per_chunk() {
        let pipeline = Pipeline::new(test_config(), Arc::new(FailingProvider)).unwrap();
        let doc = document_with_markers(&["satu", "dua"]);

        let outcome = pipeline.run(&[doc]).await;
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.report.chunks_failed, 2);
        assert_eq!(outcome.report.pairs_final, 0);
    }

    #[tokio::test]
    async fn test_empty_document_set() {
        let pipeline = Pipeline::new(test_config(), Arc::new(EchoProvider)).unwrap();
        let outcome = pipeline.run(&[]).await;
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.report.chunks_total, 0);
    }

    #[tokio::test]
    async fn test_short_chunks_rejected_by_prefilter() {
        let mut config = test_config();
        config.min_chunk_words = 30;
        let pipeline = Pipeline::new(config, Arc::new(EchoProvider)).unwrap();
        let doc = document_with_markers(&["satu", "dua"]);

        let outcome = pipeline.run(&[doc]).await;
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.report.chunks_rejected_prefilter, 2);
    }

    #[tokio::test]
    async fn test_skip_review_uses_keyword_screen() {
        let mut config = test_config();
        config.skip_review = true;
        let pipeline = Pipeline::new(config, Arc::new(EchoProvider)).unwrap();
        let doc = document_with_markers(&["merdeka"]);

        let outcome = pipeline.run(&[doc]).await;
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.report.review_accepted, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_assembly() {
        let mut config = test_config();
        config.workers = 0;
        let result = Pipeline::new(config, Arc::new(EchoProvider));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_adaptive_target_scales_with_corpus() {
        // 4000 words over 10 chunks: 100 by words, 200 by chunks.
        assert_eq!(adaptive_target(4000, 10, 1000), 100);
        // Tiny corpus clamps up to the minimum.
        assert_eq!(adaptive_target(200, 1, 1000), 50);
        // Huge corpus clamps down to the maximum.
        assert_eq!(adaptive_target(100_000, 500, 1000), 200);
        // Rounded down to a multiple of ten.
        assert_eq!(adaptive_target(3_080, 10, 1000), 70);
        // The configured maximum always wins.
        assert_eq!(adaptive_target(100_000, 500, 120), 120);
    }
}
