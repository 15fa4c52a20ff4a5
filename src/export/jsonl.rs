//! JSONL export.

use std::io::{self, Write};
use std::path::Path;

use crate::agents::QaPair;
use crate::error::ExportError;

/// Writes the pairs as JSON Lines, one object per line in input order.
///
/// An empty pair slice writes nothing.
pub fn write_jsonl_to<W: io::Write>(mut writer: W, pairs: &[QaPair]) -> Result<(), ExportError> {
    for pair in pairs {
        serde_json::to_writer(&mut writer, pair)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Creates or truncates `path` and writes the pairs as JSONL.
pub fn write_jsonl(path: &Path, pairs: &[QaPair]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_jsonl_to(io::BufWriter::new(file), pairs)
}
