//! Output writers for the final pair set.
//!
//! Both writers take the ordered pair slice and replace the target file
//! whole, so re-running a finished pipeline is idempotent.

pub mod csv;
pub mod jsonl;

pub use csv::{write_csv, write_csv_to};
pub use jsonl::{write_jsonl, write_jsonl_to};
