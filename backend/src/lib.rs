//! # Surveymeta - speaker metadata from questionnaire exports
//!
//! Surveymeta turns the CSV export of a participant questionnaire into one
//! `key=value` `.meta` file per participant code and recording suffix.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV Export │────▶│   Parser    │────▶│  Transform  │────▶│ .meta files │
//! │  (ISO/UTF8) │     │  (schema)   │     │ (DSL+group) │     │ (per suffix)│
//! └─────────────┘     └─────────────┘     └──────▲──────┘     └─────────────┘
//!                                                │
//!                                         ┌──────┴──────┐
//!                                         │    Scan     │
//!                                         │ (file names)│
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use surveymeta::{run, PipelineOptions};
//! use std::path::Path;
//!
//! let report = run(
//!     Path::new("results-survey.csv"),
//!     Path::new("meta"),
//!     &PipelineOptions::default(),
//! ).unwrap();
//! println!("Wrote {} files", report.written.files.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, field values, participant codes, metadata sets
//! - [`parser`] - CSV loading with encoding detection and schema check
//! - [`transform`] - Extraction DSL, grouping, suffix decoding, pipeline
//! - [`scan`] - File-name suffix discovery
//! - [`output`] - `.meta` file writer
//! - [`logging`] - Tracing subscriber setup

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// File system
pub mod output;
pub mod scan;

pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, PipelineError, ScanError, TransformError, WriteError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, CodeParts, CodePattern, FieldValue, MetadataSet};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, load_survey, parse_survey_str, SurveySchema, SurveyTable,
};

// =============================================================================
// Re-exports - DSL
// =============================================================================

pub use transform::dsl::{
    aggregate, rueg_matrix, DerivedTable, ExtractOptions, ExtractionMatrix, Extractor,
    MissingResponsePolicy,
};

// =============================================================================
// Re-exports - Grouper & Suffix
// =============================================================================

pub use transform::{decode_suffix, group_by_code, DuplicatePolicy, GroupOptions, GroupResult};

// =============================================================================
// Re-exports - Scan & Output
// =============================================================================

pub use output::{write_meta_files, WriteSummary};
pub use scan::{scan_suffixes, SuffixIndex};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{run, PipelineOptions, PipelineReport};
