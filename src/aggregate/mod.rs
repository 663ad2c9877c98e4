//! Consolidating salmon quantifications into a samples x genes matrix

mod discover;
mod merge;

pub use discover::{derive_sample_id, discover_quant_files, read_sample_sheet, SampleQuant};
pub use merge::{aggregate_quants, assemble, DuplicatePolicy};
