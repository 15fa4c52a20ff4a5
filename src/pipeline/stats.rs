//! Per-stage run statistics.
//!
//! Counters are atomic so concurrent chunk tasks can record outcomes
//! without taking the pair-bank lock. A [`StatsReport`] snapshot is taken
//! once at the end of the run for logging and serialization.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters updated by pipeline stages during a run.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Chunks produced by the chunker across all documents.
    pub chunks_total: AtomicU64,
    /// Chunks rejected by the pre-filter.
    pub chunks_rejected_prefilter: AtomicU64,
    /// Chunks skipped after a generation-stage transport failure.
    pub chunks_failed: AtomicU64,
    /// Candidate pairs parsed out of generation responses.
    pub candidates_generated: AtomicU64,
    /// Generation lines discarded as unparseable.
    pub parse_discards: AtomicU64,
    /// Candidates the reviewer accepted unchanged.
    pub review_accepted: AtomicU64,
    /// Candidates the reviewer accepted with edits.
    pub review_edited: AtomicU64,
    /// Candidates the reviewer rejected.
    pub review_rejected: AtomicU64,
    /// Candidates dropped on review transport or parse failure.
    pub review_failed: AtomicU64,
    /// Reviewed pairs dropped as near duplicates.
    pub duplicates_rejected: AtomicU64,
    /// Pairs in the final output.
    pub pairs_final: AtomicU64,
}

impl RunStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Increments a counter by one.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot for end-of-run reporting.
    pub fn snapshot(&self) -> StatsReport {
        StatsReport {
            chunks_total: self.chunks_total.load(Ordering::Relaxed),
            chunks_rejected_prefilter: self.chunks_rejected_prefilter.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            candidates_generated: self.candidates_generated.load(Ordering::Relaxed),
            parse_discards: self.parse_discards.load(Ordering::Relaxed),
            review_accepted: self.review_accepted.load(Ordering::Relaxed),
            review_edited: self.review_edited.load(Ordering::Relaxed),
            review_rejected: self.review_rejected.load(Ordering::Relaxed),
            review_failed: self.review_failed.load(Ordering::Relaxed),
            duplicates_rejected: self.duplicates_rejected.load(Ordering::Relaxed),
            pairs_final: self.pairs_final.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of the run counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub chunks_total: u64,
    pub chunks_rejected_prefilter: u64,
    pub chunks_failed: u64,
    pub candidates_generated: u64,
    pub parse_discards: u64,
    pub review_accepted: u64,
    pub review_edited: u64,
    pub review_rejected: u64,
    pub review_failed: u64,
    pub duplicates_rejected: u64,
    pub pairs_final: u64,
}

impl StatsReport {
    /// Candidates that survived review, edited or not.
    pub fn review_survivors(&self) -> u64 {
        self.review_accepted + self.review_edited
    }
}
