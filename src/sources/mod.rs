//! Input document discovery and loading.

use std::fs;
use std::path::Path;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A loaded input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name of the document, used as the source identifier.
    pub source: String,
    /// Full text content.
    pub text: String,
}

/// Errors from input discovery.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid input pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Finds and loads documents matching a glob-style pattern.
///
/// The pattern is a path whose final component may contain `*` wildcards
/// (e.g. `data/*.txt`). Matching walks the pattern's directory without
/// recursing. Files are returned sorted by name so discovery order is
/// stable; a file that fails to read is skipped with a warning rather than
/// aborting the run.
pub fn discover(pattern: &str) -> Result<Vec<Document>, SourceError> {
    let path = Path::new(pattern);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let file_pattern = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SourceError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "missing file component".to_string(),
        })?;

    let matcher = compile_pattern(file_pattern).map_err(|reason| SourceError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    })?;

    let root = dir.unwrap_or_else(|| Path::new("."));
    let mut documents = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        match fs::read_to_string(entry.path()) {
            Ok(text) => {
                debug!(source = %name, bytes = text.len(), "loaded document");
                documents.push(Document {
                    source: name.to_string(),
                    text,
                });
            }
            Err(err) => {
                warn!(source = %name, error = %err, "skipping unreadable file");
            }
        }
    }

    Ok(documents)
}

/// Compiles a `*`-wildcard file pattern to an anchored regex.
fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    let mut regex = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).map_err(|e| e.to_string())
}
