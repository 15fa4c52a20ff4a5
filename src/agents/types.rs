//! Shared data types for the agent stages.

use serde::{Deserialize, Serialize};

/// A question-answer pair tied to its originating document.
///
/// This is both the candidate shape produced by the generator and the final
/// shape written to CSV/JSONL output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// The question text, in the target language.
    pub question: String,
    /// The answer text, supported by the source chunk.
    pub answer: String,
    /// Identifier of the originating document. Never altered after
    /// generation, including by reviewer edits.
    pub source: String,
}

impl QaPair {
    /// Creates a new pair.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            source: source.into(),
        }
    }
}

/// A generated pair plus the chunk it came from.
///
/// The chunk index is carried so the orchestrator can order final output
/// deterministically by document position rather than completion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The proposed pair.
    pub pair: QaPair,
    /// Sequence index of the chunk this pair was derived from.
    pub chunk_index: usize,
}

/// Reviewer verdict over a candidate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// The pair is correct as generated.
    Accept,
    /// The pair needed correction; the reviewer supplies replacement text.
    /// The source field of the candidate is never altered.
    Edit { question: String, answer: String },
    /// The pair is unusable; the reason is retained for run statistics.
    Reject { reason: String },
}

impl ReviewVerdict {
    /// Applies this verdict to a candidate pair.
    ///
    /// Returns the surviving pair for `Accept`/`Edit`, or `None` for
    /// `Reject`. Edits replace question and answer only.
    pub fn apply(self, pair: QaPair) -> Option<QaPair> {
        match self {
            ReviewVerdict::Accept => Some(pair),
            ReviewVerdict::Edit { question, answer } => Some(QaPair {
                question,
                answer,
                source: pair.source,
            }),
            ReviewVerdict::Reject { .. } => None,
        }
    }
}
