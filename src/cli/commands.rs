//! Command handlers.

use std::path::Path;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use tracing::{info, warn};

use crate::export;
use crate::llm::OpenAiClient;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::sources;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

/// Arguments for the generate command.
///
/// Every option falls back to its `QNA_*` environment variable, then to the
/// compiled default.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Glob pattern selecting input documents (e.g. "data/*.txt")
    #[arg(long, env = "QNA_INPUT_GLOB")]
    pub input: Option<String>,

    /// Output file path
    #[arg(long, env = "QNA_OUTPUT_PATH")]
    pub output: Option<String>,

    /// Output file format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Maximum number of pairs for the run
    #[arg(long, env = "QNA_MAX_PAIRS")]
    pub max_pairs: Option<usize>,

    /// Chunk window size in words
    #[arg(long, env = "QNA_CHUNK_WORDS")]
    pub chunk_words: Option<usize>,

    /// Overlap in words between consecutive chunks
    #[arg(long, env = "QNA_CHUNK_OVERLAP")]
    pub chunk_overlap: Option<usize>,

    /// Similarity threshold for duplicate questions (0.0-1.0)
    #[arg(long, env = "QNA_DUP_QUESTION_SIM")]
    pub dup_threshold: Option<f64>,

    /// Number of chunks processed concurrently
    #[arg(long, env = "QNA_WORKERS")]
    pub workers: Option<usize>,

    /// Model for the generation stage
    #[arg(long, env = "QNA_GEN_MODEL")]
    pub gen_model: Option<String>,

    /// Model for the pre-filter and review stages
    #[arg(long, env = "QNA_REVIEW_MODEL")]
    pub review_model: Option<String>,

    /// Target language of generated pairs
    #[arg(long, env = "QNA_LANGUAGE")]
    pub language: Option<String>,

    /// Replace LLM review with the fast keyword screen
    #[arg(long)]
    pub skip_review: bool,

    /// Route ambiguous pre-filter cases through an LLM call
    #[arg(long)]
    pub llm_prefilter: bool,

    /// Derive the pair target from corpus size
    #[arg(long)]
    pub adaptive_target: bool,
}

impl GenerateArgs {
    /// Builds the pipeline configuration: defaults, then environment,
    /// then explicit flags.
    pub fn resolve_config(&self) -> Result<PipelineConfig, crate::ConfigError> {
        let mut config = PipelineConfig::from_env()?;
        if let Some(input) = &self.input {
            config.input_pattern = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(max_pairs) = self.max_pairs {
            config.max_pairs = max_pairs;
        }
        if let Some(chunk_words) = self.chunk_words {
            config.chunk_words = chunk_words;
        }
        if let Some(chunk_overlap) = self.chunk_overlap {
            config.chunk_overlap = chunk_overlap;
        }
        if let Some(threshold) = self.dup_threshold {
            config.dup_threshold = threshold;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(model) = &self.gen_model {
            config.gen_model = model.clone();
        }
        if let Some(model) = &self.review_model {
            config.review_model = model.clone();
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if self.skip_review {
            config.skip_review = true;
        }
        if self.llm_prefilter {
            config.llm_prefilter = true;
        }
        if self.adaptive_target {
            config.adaptive_target = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Runs the full generation pipeline and writes the output file.
pub async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;

    let documents = sources::discover(&config.input_pattern)?;
    if documents.is_empty() {
        warn!(pattern = %config.input_pattern, "no input documents found");
    }

    let llm = Arc::new(OpenAiClient::from_env()?);
    let pipeline = Pipeline::new(config.clone(), llm)?;
    let outcome = pipeline.run(&documents).await;

    let path = Path::new(&config.output_path);
    match args.format {
        OutputFormat::Csv => export::write_csv(path, &outcome.pairs)?,
        OutputFormat::Jsonl => export::write_jsonl(path, &outcome.pairs)?,
    }

    let report = &outcome.report;
    info!(
        output = %config.output_path,
        chunks = report.chunks_total,
        rejected_prefilter = report.chunks_rejected_prefilter,
        failed_chunks = report.chunks_failed,
        candidates = report.candidates_generated,
        review_accepted = report.review_accepted,
        review_edited = report.review_edited,
        review_rejected = report.review_rejected,
        review_failed = report.review_failed,
        duplicates = report.duplicates_rejected,
        pairs = report.pairs_final,
        "dataset written"
    );

    Ok(())
}
