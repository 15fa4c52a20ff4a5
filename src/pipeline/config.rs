//! Pipeline configuration.
//!
//! Configuration is resolved in three layers: compiled defaults, `QNA_*`
//! environment variables, then CLI flags applied by the command layer via
//! the `with_*` builders. `validate()` runs once before the pipeline
//! starts; any violation is fatal.

use std::env;

use thiserror::Error;

/// Default model for both the generation and review stages.
pub const DEFAULT_MODEL: &str = "qwen/qwen3-next-80b-a3b-instruct";

/// Errors from configuration validation and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidEnvValue { key: String, value: String },

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("worker count must be greater than zero")]
    ZeroWorkers,

    #[error("max pairs must be greater than zero")]
    ZeroMaxPairs,

    #[error("duplicate threshold {0} must be within 0.0..=1.0")]
    ThresholdOutOfRange(f64),

    #[error("input pattern must not be empty")]
    EmptyInputPattern,

    #[error("model name must not be empty")]
    EmptyModel,
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Window size in words for chunking.
    pub chunk_words: usize,
    /// Overlap in words between consecutive windows.
    pub chunk_overlap: usize,
    /// Minimum words for a chunk to pass the pre-filter.
    pub min_chunk_words: usize,
    /// Similarity threshold above which two questions are duplicates.
    pub dup_threshold: f64,
    /// Target number of pairs for the whole run.
    pub max_pairs: usize,
    /// Hard cap on pairs taken from a single chunk.
    pub max_pairs_per_chunk: usize,
    /// Number of chunks processed concurrently.
    pub workers: usize,
    /// Glob-style pattern selecting input documents.
    pub input_pattern: String,
    /// Path of the output file.
    pub output_path: String,
    /// Model for the generation stage.
    pub gen_model: String,
    /// Model for the pre-filter and review stages.
    pub review_model: String,
    /// Target language of generated pairs.
    pub language: String,
    /// Replace LLM review with the keyword screen.
    pub skip_review: bool,
    /// Route ambiguous pre-filter cases through an LLM call.
    pub llm_prefilter: bool,
    /// Derive the run target from corpus size instead of using `max_pairs`
    /// directly. The configured `max_pairs` still caps the derived value.
    pub adaptive_target: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_words: 800,
            chunk_overlap: 100,
            min_chunk_words: 50,
            dup_threshold: 0.88,
            max_pairs: 100,
            max_pairs_per_chunk: 10,
            workers: 5,
            input_pattern: "data/*.txt".to_string(),
            output_path: "qa_dataset.csv".to_string(),
            gen_model: DEFAULT_MODEL.to_string(),
            review_model: DEFAULT_MODEL.to_string(),
            language: "Bahasa Melayu".to_string(),
            skip_review: false,
            llm_prefilter: false,
            adaptive_target: false,
        }
    }
}

impl PipelineConfig {
    /// Builds a configuration from defaults overridden by `QNA_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvValue` when a set variable does not
    /// parse. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_env_value("QNA_CHUNK_WORDS")? {
            config.chunk_words = v;
        }
        if let Some(v) = parse_env_value("QNA_CHUNK_OVERLAP")? {
            config.chunk_overlap = v;
        }
        if let Some(v) = parse_env_value("QNA_MIN_CHUNK_WORDS")? {
            config.min_chunk_words = v;
        }
        if let Some(v) = parse_env_value("QNA_DUP_QUESTION_SIM")? {
            config.dup_threshold = v;
        }
        if let Some(v) = parse_env_value("QNA_MAX_PAIRS")? {
            config.max_pairs = v;
        }
        if let Some(v) = parse_env_value("QNA_MAX_PAIRS_PER_CHUNK")? {
            config.max_pairs_per_chunk = v;
        }
        if let Some(v) = parse_env_value("QNA_WORKERS")? {
            config.workers = v;
        }
        if let Ok(v) = env::var("QNA_INPUT_GLOB") {
            config.input_pattern = v;
        }
        if let Ok(v) = env::var("QNA_OUTPUT_PATH") {
            config.output_path = v;
        }
        if let Ok(v) = env::var("QNA_GEN_MODEL") {
            config.gen_model = v;
        }
        if let Ok(v) = env::var("QNA_REVIEW_MODEL") {
            config.review_model = v;
        }
        if let Ok(v) = env::var("QNA_LANGUAGE") {
            config.language = v;
        }
        if let Some(v) = parse_env_bool("QNA_SKIP_REVIEW")? {
            config.skip_review = v;
        }
        if let Some(v) = parse_env_bool("QNA_LLM_PREFILTER")? {
            config.llm_prefilter = v;
        }
        if let Some(v) = parse_env_bool("QNA_ADAPTIVE_TARGET")? {
            config.adaptive_target = v;
        }

        Ok(config)
    }

    /// Checks all invariants; the pipeline refuses to start otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_words == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_words {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_words,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.max_pairs == 0 || self.max_pairs_per_chunk == 0 {
            return Err(ConfigError::ZeroMaxPairs);
        }
        if !(0.0..=1.0).contains(&self.dup_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.dup_threshold));
        }
        if self.input_pattern.is_empty() {
            return Err(ConfigError::EmptyInputPattern);
        }
        if self.gen_model.is_empty() || self.review_model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        Ok(())
    }

    /// Sets the run-wide pair target.
    pub fn with_max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = max_pairs;
        self
    }

    /// Sets the chunk window and overlap sizes.
    pub fn with_chunking(mut self, chunk_words: usize, chunk_overlap: usize) -> Self {
        self.chunk_words = chunk_words;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Sets the duplicate-question similarity threshold.
    pub fn with_dup_threshold(mut self, threshold: f64) -> Self {
        self.dup_threshold = threshold;
        self
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the input pattern.
    pub fn with_input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_pattern = pattern.into();
        self
    }

    /// Sets the output path.
    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = path.into();
        self
    }
}

/// Reads and parses an environment variable, `None` when unset.
fn parse_env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Reads a boolean environment variable ("true"/"1"/"false"/"0").
fn parse_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvValue {
                key: key.to_string(),
                value,
            }),
        },
        Err(_) => Ok(None),
    }
}
