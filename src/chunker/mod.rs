//! Overlapping word-window chunker.
//!
//! Splits a document's word sequence into windows of `chunk_words` words,
//! advancing by `chunk_words - overlap_words` per step. The final window may
//! be shorter. `overlap >= size` is rejected upstream by
//! `PipelineConfig::validate`; the chunker itself clamps the stride to 1 so
//! it can never loop forever.

/// One window of a source document.
///
/// Immutable once produced; consumed by the pre-filter and carried through
/// the generation stage as supporting text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The window text (words joined by single spaces).
    pub text: String,
    /// Identifier of the originating document.
    pub source: String,
    /// Zero-based sequence index of this window within the document.
    pub index: usize,
}

impl Chunk {
    /// Number of words in this chunk.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Word-window chunker for a single document.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_words: usize,
    overlap_words: usize,
}

impl Chunker {
    /// Creates a chunker with the given window and overlap sizes (in words).
    pub fn new(chunk_words: usize, overlap_words: usize) -> Self {
        Self {
            chunk_words,
            overlap_words,
        }
    }

    /// Splits `text` into overlapping windows tagged with `source`.
    ///
    /// Whitespace of any kind separates words; windows are re-joined with
    /// single spaces. An empty or whitespace-only document yields no chunks.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let stride = self.chunk_words.saturating_sub(self.overlap_words).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        while start < words.len() {
            let end = (start + self.chunk_words).min(words.len());
            chunks.push(Chunk {
                text: words[start..end].join(" "),
                source: source.to_string(),
                index,
            });
            if end == words.len() {
                break;
            }
            start += stride;
            index += 1;
        }

        chunks
    }
}
