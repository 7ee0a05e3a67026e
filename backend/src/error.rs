//! Error types for the surveymeta pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - Survey export loading errors
//! - [`TransformError`] - Extraction matrix errors
//! - [`ScanError`] - File-name scan errors
//! - [`WriteError`] - `.meta` output errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Data problems that only affect a single row (unknown code, odd suffix,
//! unreadable date) are not errors; they are logged and recovered from
//! where they occur.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Loading Errors
// =============================================================================

/// Errors while loading the survey export.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the file contents.
    #[error("Failed to decode file: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// A column required by the survey schema is absent.
    #[error("Survey export lacks required column '{0}'")]
    MissingColumn(String),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors while running the extraction matrix.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Invalid extraction matrix.
    #[error("Invalid extraction matrix: {0}")]
    InvalidMatrix(String),

    /// An extractor references a column the table does not have.
    #[error("Extractor for '{field}' needs missing column '{column}'")]
    MissingColumn { field: String, column: String },

    /// Two rows for the same code disagree and duplicates are rejected.
    #[error("Code '{code}' has conflicting values for '{field}': '{first}' vs '{second}'")]
    ConflictingDuplicate {
        code: String,
        field: String,
        first: String,
        second: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Scan Errors
// =============================================================================

/// Errors while scanning the recording tree for file suffixes.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A directory entry could not be read.
    #[error("Cannot walk '{path}': {message}")]
    Walk { path: PathBuf, message: String },

    /// A candidate file name does not split into `<code>_<suffix>.<ext>`.
    #[error("File name '{name}' ({path}) does not follow <code>_<suffix>.<ext>: got {tokens} tokens")]
    MalformedName {
        name: String,
        path: PathBuf,
        tokens: usize,
    },
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing `.meta` files.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The target path exists but is not a directory.
    #[error("Target '{0}' exists and is not a directory")]
    NotADirectory(PathBuf),

    /// The target directory could not be created.
    #[error("Cannot create target directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `.meta` file could not be written.
    #[error("Cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Survey loading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Extraction error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// File-name scan error.
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Output error.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// Custom matrix file could not be read.
    #[error("Cannot read matrix file '{path}': {source}")]
    MatrixFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type for output operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
