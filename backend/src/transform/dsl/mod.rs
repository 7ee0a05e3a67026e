//! Declarative extraction of `.meta` fields from survey answers
//!
//! This module provides:
//! - `matrix`: Extraction matrix definition (output field → rule)
//! - `extractors`: Available extraction rules
//! - `aggregator`: Run a matrix over a survey table
//!
//! ## Usage Flow
//!
//! ```text
//! CSV → parser::load_survey → ExtractionMatrix::validate → aggregator::aggregate → DerivedTable
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use surveymeta::parser::{parse_survey_str, SurveySchema};
//! use surveymeta::transform::dsl::{aggregate, rueg_matrix, ExtractOptions};
//!
//! // 1. Load the export
//! let table = parse_survey_str(csv_content, ',', &SurveySchema::rueg()).unwrap();
//!
//! // 2. Pick a matrix (built in or from JSON)
//! let matrix = rueg_matrix();
//!
//! // 3. Derive one column per field
//! let derived = aggregate(&table, &matrix, &ExtractOptions::default()).unwrap();
//! println!("{} rows, fields: {:?}", derived.len(), derived.fields());
//! ```

pub mod aggregator;
pub mod extractors;
pub mod matrix;

// Re-exports for convenience
pub use aggregator::{aggregate, DerivedTable};
pub use extractors::{ExtractOptions, Extractor, MissingResponsePolicy};
pub use matrix::{
    is_internal, rueg_matrix, ExtractionMatrix, FieldRule, PROJECT_FIELD, SPEAKER_ID_FIELD,
};
