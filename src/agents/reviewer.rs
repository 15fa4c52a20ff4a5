//! Reviewer agent: verifies each candidate pair against its supporting text.
//!
//! The reviewer fails closed. Any transport error, unparseable response or
//! unknown status drops the candidate; only an explicit accept or edit lets
//! a pair through.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::agents::types::{QaPair, ReviewVerdict};
use crate::error::LlmError;
use crate::llm::{extract_embedded_object, GenerationRequest, LlmProvider, Message};
use crate::prompts::build_review_prompt;

/// Substrings whose presence in a pair marks it as metadata leakage.
///
/// Used by the skip-review fast path as a cheap stand-in for the LLM
/// reviewer's metadata check.
const METADATA_KEYWORDS: &[&str] = &[
    "file://", "path://", "http://", "https://", "metadata:", "e-mel:", "@", ".com",
];

/// Configuration for the review stage.
#[derive(Debug, Clone)]
pub struct ReviewerConfig {
    /// Model used for review calls.
    pub model: String,
    /// Sampling temperature. Review is deterministic by default.
    pub temperature: f64,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.0,
        }
    }
}

/// Raw verdict shape as emitted by the model.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    status: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// The review agent.
pub struct ReviewerAgent {
    config: ReviewerConfig,
    llm: Arc<dyn LlmProvider>,
}

impl ReviewerAgent {
    /// Creates a reviewer backed by the given provider.
    pub fn new(config: ReviewerConfig, llm: Arc<dyn LlmProvider>) -> Self {
        Self { config, llm }
    }

    /// Reviews one candidate pair against its supporting chunk text.
    ///
    /// # Errors
    ///
    /// Returns the provider's error on transport failure, and
    /// `LlmError::ParseError` when the response carries no usable verdict.
    /// Callers treat both as a rejection of the candidate.
    pub async fn review(
        &self,
        pair: &QaPair,
        supporting_text: &str,
    ) -> Result<ReviewVerdict, LlmError> {
        let pair_json = serde_json::to_string(pair)
            .map_err(|e| LlmError::ParseError(format!("failed to serialize pair: {}", e)))?;
        let prompt = build_review_prompt(&pair_json, supporting_text);
        let request = GenerationRequest::new(
            self.config.model.clone(),
            vec![Message::system(prompt.system), Message::user(prompt.user)],
        )
        .with_temperature(self.config.temperature);

        let response = self.llm.generate(request).await?;
        let content = response.first_content().ok_or(LlmError::EmptyCompletion)?;

        let json = extract_embedded_object(content).ok_or_else(|| {
            LlmError::ParseError("review response contained no JSON object".to_string())
        })?;
        let raw: RawVerdict = serde_json::from_str(&json)
            .map_err(|e| LlmError::ParseError(format!("invalid review verdict: {}", e)))?;

        self.map_verdict(raw, pair)
    }

    fn map_verdict(&self, raw: RawVerdict, pair: &QaPair) -> Result<ReviewVerdict, LlmError> {
        match raw.status.to_lowercase().as_str() {
            "accept" => Ok(ReviewVerdict::Accept),
            "edit" => {
                // An edit without replacement text falls back to the
                // original field, which amounts to an accept.
                let question = raw
                    .question
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| pair.question.clone());
                let answer = raw
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| pair.answer.clone());
                Ok(ReviewVerdict::Edit { question, answer })
            }
            "reject" => Ok(ReviewVerdict::Reject {
                reason: raw.reason.unwrap_or_else(|| "rejected".to_string()),
            }),
            other => {
                warn!(status = %other, "unknown review status");
                Err(LlmError::ParseError(format!(
                    "unknown review status: {}",
                    other
                )))
            }
        }
    }
}

/// Cheap metadata screen used when LLM review is disabled.
///
/// Returns `Accept` when the pair is clean, or `Reject` naming the keyword
/// that matched. Matching is case-insensitive over question and answer.
pub fn screen_pair(pair: &QaPair) -> ReviewVerdict {
    let haystack = format!("{} {}", pair.question, pair.answer).to_lowercase();
    for keyword in METADATA_KEYWORDS {
        if haystack.contains(keyword) {
            return ReviewVerdict::Reject {
                reason: format!("metadata keyword: {}", keyword),
            };
        }
    }
    ReviewVerdict::Accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Choice, GenerationResponse};
    use async_trait::async_trait;

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

    fn reviewer(reply: &str) -> ReviewerAgent {
        ReviewerAgent::new(
            ReviewerConfig {
                model: "test".to_string(),
                ..Default::default()
            },
            Arc::new(ScriptedProvider {
                reply: reply.to_string(),
            }),
        )
    }

    fn pair() -> QaPair {
        QaPair::new("Apakah ibu negara Malaysia?", "Kuala Lumpur", "sample.txt")
    }

    #[tokio::test]
    async fn test_accept_verdict() {
        let verdict = reviewer(r#"{"status":"accept"}"#)
            .review(&pair(), "Kuala Lumpur ialah ibu negara Malaysia.")
            .await
            .unwrap();
        assert_eq!(verdict, ReviewVerdict::Accept);
    }

    #[tokio::test]
    async fn test_edit_verdict_carries_replacement_text() {
        let reply = r#"{"status":"edit","question":"Apakah ibu negara Malaysia?","answer":"Ibu negara Malaysia ialah Kuala Lumpur.","reason":"jawapan dipendekkan"}"#;
        let verdict = reviewer(reply).review(&pair(), "teks").await.unwrap();
        assert_eq!(
            verdict,
            ReviewVerdict::Edit {
                question: "Apakah ibu negara Malaysia?".to_string(),
                answer: "Ibu negara Malaysia ialah Kuala Lumpur.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_edit_without_fields_falls_back_to_original() {
        let verdict = reviewer(r#"{"status":"edit"}"#)
            .review(&pair(), "teks")
            .await
            .unwrap();
        assert_eq!(
            verdict,
            ReviewVerdict::Edit {
                question: pair().question,
                answer: pair().answer,
            }
        );
    }

    #[tokio::test]
    async fn test_reject_verdict_with_reason() {
        let reply = r#"{"status":"reject","reason":"tidak disokong oleh teks"}"#;
        let verdict = reviewer(reply).review(&pair(), "teks").await.unwrap();
        assert_eq!(
            verdict,
            ReviewVerdict::Reject {
                reason: "tidak disokong oleh teks".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_verdict_wrapped_in_fences_and_prose() {
        let reply = "Berikut keputusan saya:\n```json\n{\"status\":\"accept\"}\n```";
        let verdict = reviewer(reply).review(&pair(), "teks").await.unwrap();
        assert_eq!(verdict, ReviewVerdict::Accept);
    }

    #[tokio::test]
    async fn test_garbage_response_fails_closed() {
        let err = reviewer("maaf, saya tidak pasti").review(&pair(), "teks").await;
        assert!(matches!(err, Err(LlmError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_unknown_status_fails_closed() {
        let err = reviewer(r#"{"status":"maybe"}"#).review(&pair(), "teks").await;
        assert!(matches!(err, Err(LlmError::ParseError(_))));
    }

    #[test]
    fn test_screen_accepts_clean_pair() {
        assert_eq!(screen_pair(&pair()), ReviewVerdict::Accept);
    }

    #[test]
    fn test_screen_rejects_url_leakage() {
        let leaky = QaPair::new(
            "Di mana boleh baca lagi?",
            "Lihat https://contoh.my/artikel",
            "sample.txt",
        );
        assert!(matches!(screen_pair(&leaky), ReviewVerdict::Reject { .. }));
    }

    #[test]
    fn test_screen_rejects_email_leakage() {
        let leaky = QaPair::new("Siapa penulis?", "Hubungi ali@contoh.my", "sample.txt");
        assert!(matches!(screen_pair(&leaky), ReviewVerdict::Reject { .. }));
    }
}
