//! CSV export.

use std::io;
use std::path::Path;

use crate::agents::QaPair;
use crate::error::ExportError;

/// Writes the pairs as CSV with a `question,answer,source` header row.
///
/// An empty pair slice still produces the header. Quoting and escaping of
/// embedded commas, quotes and newlines is handled by the writer.
pub fn write_csv_to<W: io::Write>(writer: W, pairs: &[QaPair]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["question", "answer", "source"])?;
    for pair in pairs {
        writer.write_record([&pair.question, &pair.answer, &pair.source])?;
    }
    writer.flush().map_err(ExportError::Io)?;
    Ok(())
}

/// Creates or truncates `path` and writes the pairs as CSV.
pub fn write_csv(path: &Path, pairs: &[QaPair]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv_to(file, pairs)
}
