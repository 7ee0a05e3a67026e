//! High-level pipeline API for survey export to `.meta` files.
//!
//! This module combines all steps: loading, extraction, code validation and
//! grouping, file-name scan, suffix decoding and writing.
//!
//! # Example
//!
//! ```rust,ignore
//! use surveymeta::transform::pipeline::{run, PipelineOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = run(
//!         Path::new("results-survey.csv"),
//!         Path::new("meta"),
//!         &PipelineOptions::default(),
//!     )?;
//!
//!     println!("Wrote {} files", report.written.files.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::dsl::{aggregate, ExtractOptions, ExtractionMatrix};
use super::grouper::{group_by_code, DroppedRow, FieldConflict, GroupOptions};
use crate::error::{PipelineError, PipelineResult, TransformError};
use crate::models::CodePattern;
use crate::output::{check_target_dir, write_meta_files, WriteSummary};
use crate::parser::load_survey;
use crate::scan::scan_suffixes;

/// Options for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Root of the recording tree scanned for file suffixes
    pub scan_root: PathBuf,

    /// CSV delimiter of the survey export
    pub delimiter: char,

    /// Use a matrix file instead of the built-in one
    pub matrix_path: Option<PathBuf>,

    /// Code validation and grouping
    #[serde(default)]
    pub group: GroupOptions,

    /// Extraction settings
    #[serde(default)]
    pub extract: ExtractOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scan_root: PathBuf::from("."),
            delimiter: ',',
            matrix_path: None,
            group: GroupOptions::default(),
            extract: ExtractOptions::default(),
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Rows in the survey export
    pub rows: usize,

    /// Validated participant codes
    pub codes: usize,

    /// Rows dropped for a missing or invalid code
    pub dropped: Vec<DroppedRow>,

    /// Conflicting values between rows of one code
    pub conflicts: Vec<FieldConflict>,

    /// Rows skipped by the project filter
    pub filtered: usize,

    /// Codes that have at least one file suffix in the scanned tree
    pub scanned_codes: usize,

    /// Files written
    pub written: WriteSummary,
}

/// Load the matrix named by `options`, or the built-in one.
pub fn load_matrix(options: &PipelineOptions) -> PipelineResult<ExtractionMatrix> {
    match &options.matrix_path {
        Some(path) => {
            info!(path = %path.display(), "Using provided matrix file");
            let content = std::fs::read_to_string(path).map_err(|source| PipelineError::MatrixFile {
                path: path.clone(),
                source,
            })?;
            let matrix = ExtractionMatrix::from_json(&content).map_err(TransformError::from)?;
            matrix.check()?;
            Ok(matrix)
        }
        None => Ok(ExtractionMatrix::default()),
    }
}

/// Turn a survey export into `.meta` files in `target_dir`.
///
/// This is the main entry point for the pipeline. It:
/// 1. Checks the target directory
/// 2. Loads the export and validates it against the matrix's columns
/// 3. Runs the extraction matrix over every row
/// 4. Validates codes and groups rows by code
/// 5. Scans `scan_root` for file suffixes
/// 6. Writes one file per (code, suffix)
///
/// Any configuration or naming error aborts the run before a file is
/// written.
pub fn run(
    survey_file: &Path,
    target_dir: &Path,
    options: &PipelineOptions,
) -> PipelineResult<PipelineReport> {
    check_target_dir(target_dir)?;
    let matrix = load_matrix(options)?;

    // Step 1: Load
    info!(path = %survey_file.display(), "Reading survey export");
    let table = load_survey(survey_file, options.delimiter, &matrix.schema())?;
    info!(rows = table.len(), columns = table.headers().len(), "Loaded survey export");

    // Step 2: Extract
    let derived = aggregate(&table, &matrix, &options.extract)?;
    info!(fields = derived.fields().len(), "Derived metadata fields");

    // Step 3: Group
    let pattern = CodePattern::default();
    if options.group.relaxed {
        warn!("Relaxed mode: codes are not checked against the code pattern");
    }
    let grouped = group_by_code(&derived, &pattern, &options.group)?;
    info!(
        codes = grouped.groups.len(),
        dropped = grouped.dropped.len(),
        "Grouped rows by participant code"
    );

    // Step 4: Scan
    let suffixes = scan_suffixes(&options.scan_root, &pattern)?;
    info!(
        root = %options.scan_root.display(),
        codes = suffixes.len(),
        "Scanned file names"
    );

    // Step 5: Write
    let written = write_meta_files(target_dir, &grouped.groups, &suffixes)?;
    info!(
        files = written.files.len(),
        without_suffix = written.codes_without_suffix.len(),
        target = %target_dir.display(),
        "Wrote meta files"
    );

    Ok(PipelineReport {
        rows: table.len(),
        codes: grouped.groups.len(),
        dropped: grouped.dropped,
        conflicts: grouped.conflicts,
        filtered: grouped.filtered,
        scanned_codes: suffixes.len(),
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.delimiter, ',');
        assert_eq!(opts.scan_root, PathBuf::from("."));
        assert!(!opts.group.relaxed);
        assert!(opts.matrix_path.is_none());
    }

    #[test]
    fn test_load_builtin_matrix() {
        let matrix = load_matrix(&PipelineOptions::default()).unwrap();
        assert_eq!(matrix, crate::transform::dsl::rueg_matrix());
    }

    #[test]
    fn test_load_matrix_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        std::fs::write(
            &path,
            r#"{ "fields": [ { "field": "speaker-id", "type": "trimmed", "column": "name" } ] }"#,
        )
        .unwrap();
        let options = PipelineOptions {
            matrix_path: Some(path),
            ..Default::default()
        };
        let matrix = load_matrix(&options).unwrap();
        assert_eq!(matrix.fields.len(), 1);
    }

    #[test]
    fn test_missing_matrix_file() {
        let options = PipelineOptions {
            matrix_path: Some(PathBuf::from("/nonexistent/matrix.json")),
            ..Default::default()
        };
        assert!(matches!(
            load_matrix(&options),
            Err(PipelineError::MatrixFile { .. })
        ));
    }

    #[test]
    fn test_invalid_matrix_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        std::fs::write(&path, r#"{ "fields": [ { "field": "x", "type": "bogus" } ] }"#).unwrap();
        let options = PipelineOptions {
            matrix_path: Some(path),
            ..Default::default()
        };
        assert!(matches!(
            load_matrix(&options),
            Err(PipelineError::Transform(TransformError::JsonError(_)))
        ));
    }
}
