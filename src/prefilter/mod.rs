//! Chunk pre-filter: rejects chunks before they consume a generation call.
//!
//! Checks run in order: minimum length, structural metadata markers,
//! then a majority-language heuristic. The first failing check determines
//! the rejection reason. Ambiguous language results can optionally be
//! settled by an LLM classification call; if that call fails the chunk is
//! accepted by default, since the reviewer stage remains the fail-closed
//! gate.

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::chunker::Chunk;
use crate::llm::{extract_embedded_object, GenerationRequest, LlmProvider, Message};
use crate::prompts::build_prefilter_prompt;

/// Language-ratio below which a chunk is rejected outright.
const LANGUAGE_REJECT_RATIO: f64 = 0.02;

/// Language-ratio at or above which a chunk passes without an LLM call.
const LANGUAGE_ACCEPT_RATIO: f64 = 0.08;

/// Common Malay function words used by the majority-language heuristic.
const MALAY_FUNCTION_WORDS: &[&str] = &[
    "dan", "yang", "di", "ke", "dari", "daripada", "untuk", "dengan", "pada", "adalah", "ialah",
    "ini", "itu", "tidak", "dalam", "atau", "juga", "akan", "oleh", "telah", "kepada", "sebagai",
    "mereka", "kami", "kita", "saya", "anda", "boleh", "ada", "sudah", "lebih", "bagi", "iaitu",
    "antara", "seperti", "secara", "serta", "tersebut", "apabila", "kerana",
];

/// Metadata field names that mark a document-header line.
const HEADER_FIELD_KEYWORDS: &[&str] = &[
    "ID Fail", "Tajuk", "Penulis", "Tarikh", "Bidang", "Subbidang", "Sumber", "Tahap", "Bahasa",
    "Laras", "Panjang", "Sensitif", "Format", "Kaedah", "Hak Guna", "Rujukan",
];

/// Why a chunk was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Fewer words than the configured minimum.
    TooShort { words: usize, min: usize },
    /// Structural metadata markers (bylines, emails, journal fields) present.
    MetadataMarkers,
    /// Majority-language heuristic scored the text as off-language.
    WrongLanguage,
    /// The LLM classifier rejected the chunk.
    LlmRejected(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TooShort { words, min } => {
                write!(f, "too short ({} words, minimum {})", words, min)
            }
            RejectReason::MetadataMarkers => write!(f, "metadata markers present"),
            RejectReason::WrongLanguage => write!(f, "not in target language"),
            RejectReason::LlmRejected(reason) => write!(f, "rejected by classifier: {}", reason),
        }
    }
}

/// Pre-filter decision for one chunk. Never mutates the chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected(RejectReason),
}

impl Decision {
    /// Returns true if the chunk may proceed to generation.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }
}

/// Configuration for the pre-filter stage.
#[derive(Debug, Clone)]
pub struct PrefilterConfig {
    /// Minimum word count for a chunk to be considered.
    pub min_words: usize,
    /// Model used when an ambiguous chunk is routed through the LLM.
    pub model: String,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            min_words: 50,
            model: String::new(),
        }
    }
}

/// The pre-filter stage.
pub struct Prefilter {
    config: PrefilterConfig,
    metadata_markers: Vec<Regex>,
    /// Present only when LLM-assisted classification is enabled.
    llm: Option<Arc<dyn LlmProvider>>,
}

/// Shape of the classifier's JSON verdict.
#[derive(Debug, Deserialize)]
struct ClassifierVerdict {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

impl Prefilter {
    /// Creates a pre-filter using only synchronous checks.
    pub fn new(config: PrefilterConfig) -> Self {
        Self {
            config,
            metadata_markers: Self::compile_markers(),
            llm: None,
        }
    }

    /// Creates a pre-filter that routes ambiguous chunks through an LLM.
    pub fn with_llm(config: PrefilterConfig, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            config,
            metadata_markers: Self::compile_markers(),
            llm: Some(llm),
        }
    }

    fn compile_markers() -> Vec<Regex> {
        // Patterns are fixed at compile time; unwrap is safe for literals.
        [
            r"(?im)^\s*(author|penulis|journal|jurnal|editor)\s*:",
            r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
            r"(?im)^\s*(id fail|tajuk|tarikh|rujukan|hak guna)\s*:",
            r"(?i)\bdoi\s*:\s*\S+",
            r"(?i)\bvol\.\s*\d+\s*,?\s*(no\.|issue)\s*\d+",
            r"https?://\S+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid metadata pattern"))
        .collect()
    }

    /// Runs the synchronous checks in order, returning the first failure.
    ///
    /// A `WrongLanguage` result for ratios in the ambiguous band is deferred
    /// to [`Prefilter::evaluate`] when an LLM is attached.
    fn evaluate_sync(&self, chunk: &Chunk) -> SyncOutcome {
        let words = chunk.word_count();
        if words < self.config.min_words {
            return SyncOutcome::Reject(RejectReason::TooShort {
                words,
                min: self.config.min_words,
            });
        }

        for marker in &self.metadata_markers {
            if marker.is_match(&chunk.text) {
                return SyncOutcome::Reject(RejectReason::MetadataMarkers);
            }
        }

        let ratio = language_ratio(&chunk.text);
        if ratio < LANGUAGE_REJECT_RATIO {
            return SyncOutcome::Reject(RejectReason::WrongLanguage);
        }
        if ratio < LANGUAGE_ACCEPT_RATIO {
            return SyncOutcome::Ambiguous;
        }

        SyncOutcome::Accept
    }

    /// Evaluates a chunk, consulting the LLM only for ambiguous cases.
    pub async fn evaluate(&self, chunk: &Chunk) -> Decision {
        match self.evaluate_sync(chunk) {
            SyncOutcome::Accept => Decision::Accepted,
            SyncOutcome::Reject(reason) => {
                debug!(source = %chunk.source, index = chunk.index, %reason, "chunk rejected by pre-filter");
                Decision::Rejected(reason)
            }
            SyncOutcome::Ambiguous => match &self.llm {
                Some(llm) => self.classify_with_llm(llm.as_ref(), chunk).await,
                // Without a classifier, ambiguous chunks pass through;
                // the reviewer stage still guards output quality.
                None => Decision::Accepted,
            },
        }
    }

    async fn classify_with_llm(&self, llm: &dyn LlmProvider, chunk: &Chunk) -> Decision {
        let prompt = build_prefilter_prompt(&chunk.text);
        let request = GenerationRequest::new(
            self.config.model.clone(),
            vec![Message::system(prompt.system), Message::user(prompt.user)],
        )
        .with_temperature(0.0);

        let response = match llm.generate(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(source = %chunk.source, index = chunk.index, error = %err,
                    "pre-filter classification failed, accepting by default");
                return Decision::Accepted;
            }
        };

        let Some(content) = response.first_content() else {
            return Decision::Accepted;
        };

        let Some(json) = extract_embedded_object(content) else {
            warn!(source = %chunk.source, index = chunk.index,
                "pre-filter response had no JSON, accepting by default");
            return Decision::Accepted;
        };

        match serde_json::from_str::<ClassifierVerdict>(&json) {
            Ok(verdict) if verdict.status.eq_ignore_ascii_case("reject") => Decision::Rejected(
                RejectReason::LlmRejected(verdict.reason.unwrap_or_else(|| "rejected".to_string())),
            ),
            Ok(_) => Decision::Accepted,
            Err(_) => Decision::Accepted,
        }
    }
}

enum SyncOutcome {
    Accept,
    Reject(RejectReason),
    Ambiguous,
}

/// Fraction of words that are common function words of the target language.
fn language_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut hits = 0usize;
    for word in text.split_whitespace() {
        total += 1;
        let normalized: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if MALAY_FUNCTION_WORDS.contains(&normalized.as_str()) {
            hits += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    hits as f64 / total as f64
}

/// Strips a leading metadata header from a document before chunking.
///
/// Documents in the corpus sometimes start with a field block
/// (`ID Fail : ...`, `Tajuk : ...`) or mark the body with a `Teks:` label.
/// Returns the body text; the input is returned unchanged when no header is
/// recognized.
pub fn strip_metadata_header(text: &str) -> String {
    if let Some(pos) = text.rfind("Teks:") {
        return text[pos + "Teks:".len()..].trim().to_string();
    }

    let has_header = text.contains("ID Fail") || text.contains("Tajuk :");
    if !has_header {
        return text.trim().to_string();
    }

    let mut lines = text.lines();
    let mut body: Vec<&str> = Vec::new();
    let mut in_header = true;
    for line in &mut lines {
        if in_header {
            let is_field_line = line.trim().is_empty()
                || HEADER_FIELD_KEYWORDS.iter().any(|kw| line.contains(kw));
            if is_field_line {
                continue;
            }
            in_header = false;
        }
        body.push(line);
    }
    body.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationResponse};
    use async_trait::async_trait;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: "sample.txt".to_string(),
            index: 0,
        }
    }

    fn malay_text(repeats: usize) -> String {
        "Kerajaan telah mengumumkan bahawa sekolah di seluruh negara akan dibuka semula pada minggu hadapan dan semua pelajar perlu hadir dengan pematuhan kepada garis panduan yang ditetapkan oleh pihak berkuasa. "
            .repeat(repeats)
    }

    struct ScriptedProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            Ok(GenerationResponse {
                model: "test".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.reply.clone()),
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

    #[tokio::test]
    async fn test_short_chunk_rejected() {
        let prefilter = Prefilter::new(PrefilterConfig::default());
        let decision = prefilter.evaluate(&chunk("terlalu pendek")).await;
        assert_eq!(
            decision,
            Decision::Rejected(RejectReason::TooShort { words: 2, min: 50 })
        );
    }

    #[tokio::test]
    async fn test_metadata_header_chunk_rejected_before_generation() {
        let prefilter = Prefilter::new(PrefilterConfig {
            min_words: 5,
            ..Default::default()
        });
        let decision = prefilter
            .evaluate(&chunk(
                "Author: John Doe\nJournal: Advances in Testing\nTahun terbitan ialah 2020 dan rekod ini disimpan",
            ))
            .await;
        assert_eq!(decision, Decision::Rejected(RejectReason::MetadataMarkers));
    }

    #[tokio::test]
    async fn test_email_marker_rejected() {
        let prefilter = Prefilter::new(PrefilterConfig {
            min_words: 5,
            ..Default::default()
        });
        let decision = prefilter
            .evaluate(&chunk(
                "Sila hubungi john.doe@example.com untuk maklumat lanjut mengenai kajian ini dan dokumen yang berkaitan",
            ))
            .await;
        assert_eq!(decision, Decision::Rejected(RejectReason::MetadataMarkers));
    }

    #[tokio::test]
    async fn test_malay_text_accepted() {
        let prefilter = Prefilter::new(PrefilterConfig::default());
        let decision = prefilter.evaluate(&chunk(&malay_text(3))).await;
        assert!(decision.is_accepted());
    }

    #[tokio::test]
    async fn test_english_text_rejected_as_wrong_language() {
        let prefilter = Prefilter::new(PrefilterConfig {
            min_words: 10,
            ..Default::default()
        });
        let text = "The quick brown fox jumps over a lazy dog while several other animals watch quietly from behind tall grass near an old wooden fence";
        let decision = prefilter.evaluate(&chunk(text)).await;
        assert_eq!(decision, Decision::Rejected(RejectReason::WrongLanguage));
    }

    #[tokio::test]
    async fn test_llm_reject_for_ambiguous_chunk() {
        // Exactly one function word in 20: ambiguous band (0.02..0.08).
        let text = "Sistem pangkalan data moden menyokong transaksi serentak melalui protokol dua fasa manakala replikasi log memastikan ketahanan dengan jaminan konsistensi";
        let ratio = language_ratio(text);
        assert!((LANGUAGE_REJECT_RATIO..LANGUAGE_ACCEPT_RATIO).contains(&ratio));

        let prefilter = Prefilter::with_llm(
            PrefilterConfig {
                min_words: 5,
                model: "test".to_string(),
            },
            Arc::new(ScriptedProvider {
                reply: r#"{"status":"reject","reason":"teks teknikal tidak sesuai"}"#.to_string(),
            }),
        );
        let decision = prefilter.evaluate(&chunk(text)).await;
        assert_eq!(
            decision,
            Decision::Rejected(RejectReason::LlmRejected(
                "teks teknikal tidak sesuai".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_llm_failure_accepts_by_default() {
        let text = "Sistem pangkalan data moden menyokong transaksi serentak melalui protokol dua fasa manakala replikasi log memastikan ketahanan dengan jaminan konsistensi";
        let prefilter = Prefilter::with_llm(
            PrefilterConfig {
                min_words: 5,
                model: "test".to_string(),
            },
            Arc::new(FailingProvider),
        );
        assert!(prefilter.evaluate(&chunk(text)).await.is_accepted());
    }

    #[test]
    fn test_strip_metadata_header_teks_marker() {
        let text = "ID Fail : 123\nTajuk : Contoh\nTeks: Kandungan sebenar dokumen bermula di sini.";
        assert_eq!(
            strip_metadata_header(text),
            "Kandungan sebenar dokumen bermula di sini."
        );
    }

    #[test]
    fn test_strip_metadata_header_field_lines() {
        let text = "ID Fail : 123\nTajuk : Contoh\nPenulis : Ali\n\nPerenggan pertama kandungan.\nPerenggan kedua.";
        assert_eq!(
            strip_metadata_header(text),
            "Perenggan pertama kandungan.\nPerenggan kedua."
        );
    }

    #[test]
    fn test_strip_metadata_header_passthrough() {
        let text = "Dokumen biasa tanpa sebarang pengepala metadata.";
        assert_eq!(strip_metadata_header(text), text);
    }

    #[test]
    fn test_language_ratio_empty() {
        assert_eq!(language_ratio(""), 0.0);
    }
}
