//! Question deduplication.
//!
//! Near-duplicate detection over accepted questions uses a
//! Ratcliff-Obershelp sequence ratio (2 * matches / total length) over
//! normalized text, with a configurable similarity threshold. The
//! [`QuestionBank`] combines the duplicate check with the run's pair
//! capacity in one atomic decision so concurrent workers cannot race past
//! either limit.

/// Outcome of offering a question to the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The question was admitted and is now part of the bank.
    Accepted,
    /// A sufficiently similar question is already present.
    Duplicate,
    /// The bank has reached its capacity.
    Full,
}

/// Accepted-question store with capacity and similarity gating.
#[derive(Debug)]
pub struct QuestionBank {
    threshold: f64,
    capacity: usize,
    questions: Vec<String>,
}

impl QuestionBank {
    /// Creates a bank with the given similarity threshold and capacity.
    ///
    /// The threshold is clamped to `0.0..=1.0`. A threshold of 1.0 admits
    /// everything except exact (normalized) matches.
    pub fn new(threshold: f64, capacity: usize) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            capacity,
            questions: Vec::new(),
        }
    }

    /// Offers a question; admits it unless the bank is full or a near
    /// duplicate exists.
    ///
    /// Capacity is checked first so a full bank short-circuits the
    /// similarity scan. Callers must hold the bank exclusively (a mutex in
    /// concurrent use) so check and insert are one step.
    pub fn try_accept(&mut self, question: &str) -> AcceptOutcome {
        if self.questions.len() >= self.capacity {
            return AcceptOutcome::Full;
        }
        let normalized = normalize(question);
        for existing in &self.questions {
            if sequence_ratio(existing, &normalized) >= self.threshold {
                return AcceptOutcome::Duplicate;
            }
        }
        self.questions.push(normalized);
        AcceptOutcome::Accepted
    }

    /// Number of questions admitted so far.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions have been admitted.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns true once capacity is reached.
    pub fn is_full(&self) -> bool {
        self.questions.len() >= self.capacity
    }

    /// Remaining capacity.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.questions.len())
    }
}

/// Lowercases and collapses all whitespace runs to single spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Ratcliff-Obershelp similarity ratio between two strings.
///
/// Computed as `2 * M / T` where `M` is the total length of matching
/// blocks found by recursive longest-common-substring splitting and `T`
/// is the combined length of both inputs. Operates on character
/// sequences; returns a value in `0.0..=1.0`.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Total length of matching blocks between two character slices.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (a_start, b_start, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..a_start], &b[..b_start])
        + matching_chars(&a[a_start + len..], &b[b_start + len..])
}

/// Finds the longest common substring via dynamic programming over one row.
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    if a.is_empty() || b.is_empty() {
        return best;
    }
    let mut prev = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        let mut row = vec![0usize; b.len() + 1];
        for (j, &cb) in b.iter().enumerate() {
            if ca == cb {
                let len = prev[j] + 1;
                row[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = row;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_ratio_one() {
        assert_eq!(sequence_ratio("abc", "abc"), 1.0);
    }

    #[test]
    fn test_disjoint_strings_ratio_zero() {
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_empty_strings_ratio_one() {
        assert_eq!(sequence_ratio("", ""), 1.0);
    }

    #[test]
    fn test_ratio_is_symmetric_for_common_content() {
        let a = "apakah maksud fotosintesis";
        let b = "apa maksud fotosintesis";
        let r1 = sequence_ratio(a, b);
        let r2 = sequence_ratio(b, a);
        assert!((r1 - r2).abs() < 1e-9);
        assert!(r1 > 0.8);
    }

    #[test]
    fn test_near_duplicate_malay_questions_above_threshold() {
        // 48 matched chars over 51 total: ratio ~0.941.
        let r = sequence_ratio(
            "apakah ibu negara malaysia?",
            "apa ibu negara malaysia?",
        );
        assert!(r > 0.88, "ratio was {}", r);
    }

    #[test]
    fn test_distinct_questions_below_threshold() {
        let r = sequence_ratio(
            "apakah ibu negara malaysia?",
            "bilakah malaysia mencapai kemerdekaan?",
        );
        assert!(r < 0.88, "ratio was {}", r);
    }

    #[test]
    fn test_bank_accepts_then_flags_duplicate() {
        let mut bank = QuestionBank::new(0.88, 100);
        assert_eq!(
            bank.try_accept("Apakah ibu negara Malaysia?"),
            AcceptOutcome::Accepted
        );
        assert_eq!(
            bank.try_accept("Apa ibu negara Malaysia?"),
            AcceptOutcome::Duplicate
        );
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn test_bank_normalizes_case_and_whitespace() {
        let mut bank = QuestionBank::new(0.99, 100);
        assert_eq!(bank.try_accept("Apakah itu  enzim?"), AcceptOutcome::Accepted);
        assert_eq!(bank.try_accept("APAKAH ITU ENZIM?"), AcceptOutcome::Duplicate);
    }

    #[test]
    fn test_bank_reports_full_at_capacity() {
        let mut bank = QuestionBank::new(0.88, 2);
        assert_eq!(bank.try_accept("soalan pertama tentang sejarah"), AcceptOutcome::Accepted);
        assert_eq!(bank.try_accept("kenapa langit berwarna biru"), AcceptOutcome::Accepted);
        assert!(bank.is_full());
        assert_eq!(
            bank.try_accept("berapakah bilangan planet"),
            AcceptOutcome::Full
        );
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn test_threshold_clamped() {
        let mut bank = QuestionBank::new(7.5, 10);
        assert_eq!(bank.try_accept("soalan satu"), AcceptOutcome::Accepted);
        // Clamped to 1.0: only an exact normalized match is a duplicate.
        assert_eq!(bank.try_accept("soalan dua"), AcceptOutcome::Accepted);
        assert_eq!(bank.try_accept("Soalan   satu"), AcceptOutcome::Duplicate);
    }
}
