//! Error types for quantmerge

use std::fmt;

use thiserror::Error;

/// What kind of identifier a lookup or uniqueness check was about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Sample,
    Gene,
    Accession,
    Transcript,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdKind::Sample => "sample",
            IdKind::Gene => "gene",
            IdKind::Accession => "accession",
            IdKind::Transcript => "transcript",
        };
        f.write_str(name)
    }
}

/// Main error type for quantmerge operations
#[derive(Error, Debug)]
pub enum QuantMergeError {
    #[error("{} {kind} identifier(s) not found in {source_name}: {}", .ids.len(), .ids.join(", "))]
    MissingIdentifiers {
        kind: IdKind,
        source_name: String,
        ids: Vec<String>,
    },

    #[error("Duplicate {kind} identifier '{id}' in {source_name}")]
    DuplicateIdentifier {
        kind: IdKind,
        id: String,
        source_name: String,
    },

    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Invalid numeric value '{value}' in {source_name} at line {line}")]
    InvalidValue {
        source_name: String,
        line: usize,
        value: String,
    },

    #[error("Cannot derive a sample identifier from '{name}'")]
    InvalidSampleId { name: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("{tool} failed ({status}): {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[error("Directory scan failed: {0}")]
    GlobError(#[from] glob::GlobError),
}

/// Result type alias for quantmerge operations
pub type Result<T> = std::result::Result<T, QuantMergeError>;
