//! Validate participant codes and group derived rows by code.
//!
//! This module handles the step from one derived row per questionnaire
//! response to one set of core metadata per participant.
//!
//! # Architecture
//!
//! ```text
//! Derived rows                        Grouped metadata
//! ┌──────────────────────────────┐    ┌──────────────────────────────┐
//! │ speaker-id: DEbi01MR, age 30 │    │ DEbi01MR                     │
//! │ speaker-id: (null),   age 12 │ →  │   speaker-age=30             │
//! │ speaker-id: bogus,    age 40 │    │   speaker-id=DEbi01MR ...    │
//! └──────────────────────────────┘    └──────────────────────────────┘
//!                                      dropped: row 1 (no code),
//!                                               row 2 (pattern)
//! ```
//!
//! Internal fields (`_project`, ...) never reach the grouped metadata.
//! When one code appears in several rows, the [`DuplicatePolicy`] decides
//! which value a field keeps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{TransformError, TransformResult};
use crate::models::{CodePattern, MetadataSet};
use crate::transform::dsl::{is_internal, DerivedTable, PROJECT_FIELD, SPEAKER_ID_FIELD};

/// How to resolve a field that differs between two rows of the same code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later row's value replaces the earlier one.
    #[default]
    LastWins,
    /// The first row's value is kept.
    FirstWins,
    /// Abort the run.
    Reject,
}

/// Settings for [`group_by_code`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    /// Accept codes that do not match the code pattern.
    #[serde(default)]
    pub relaxed: bool,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    /// Only keep rows whose `_project` value equals this.
    #[serde(default)]
    pub project: Option<String>,
}

/// Why a row did not make it into the grouped metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingCode,
    PatternMismatch,
}

/// A row that was dropped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    /// Zero-based row index in the survey table.
    pub row: usize,
    pub code: Option<String>,
    pub reason: DropReason,
}

/// Two rows of one code disagreeing on a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldConflict {
    pub code: String,
    pub field: String,
    pub kept: String,
    pub discarded: String,
}

/// Result of grouping a derived table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupResult {
    /// Core metadata per validated code, ordered by code.
    pub groups: BTreeMap<String, MetadataSet>,
    pub dropped: Vec<DroppedRow>,
    pub conflicts: Vec<FieldConflict>,
    /// Rows skipped by the project filter.
    pub filtered: usize,
}

/// Validate codes and collect each code's non-internal fields.
pub fn group_by_code(
    derived: &DerivedTable,
    pattern: &CodePattern,
    options: &GroupOptions,
) -> TransformResult<GroupResult> {
    let codes = derived.column(SPEAKER_ID_FIELD).ok_or_else(|| {
        TransformError::InvalidMatrix(format!("no '{SPEAKER_ID_FIELD}' field"))
    })?;
    let projects = match &options.project {
        Some(_) => Some(derived.column(PROJECT_FIELD).ok_or_else(|| {
            TransformError::InvalidMatrix(format!(
                "project filter needs a '{PROJECT_FIELD}' field"
            ))
        })?),
        None => None,
    };

    let mut result = GroupResult::default();

    for (row, code) in codes.iter().enumerate() {
        if let (Some(wanted), Some(projects)) = (&options.project, projects) {
            if projects[row].as_text() != Some(wanted.as_str()) {
                debug!(row, project = %projects[row], "Skipped row of another project");
                result.filtered += 1;
                continue;
            }
        }

        let Some(code) = code.as_text() else {
            warn!(row, "Dropped row without code");
            result.dropped.push(DroppedRow {
                row,
                code: None,
                reason: DropReason::MissingCode,
            });
            continue;
        };

        if !options.relaxed && !pattern.is_match(code) {
            warn!(row, code, "Dropped code not matching the code pattern");
            result.dropped.push(DroppedRow {
                row,
                code: Some(code.to_string()),
                reason: DropReason::PatternMismatch,
            });
            continue;
        }

        if let Some(parts) = pattern.parts(code) {
            debug!(row, code, ?parts, "Accepted code");
        }

        let metadata = result.groups.entry(code.to_string()).or_default();
        for (field, value) in derived.row(row).filter(|(f, _)| !is_internal(f)) {
            let value = value.to_string();
            match metadata.get(field) {
                None => {
                    metadata.insert(field, value);
                }
                Some(previous) if previous == value => {}
                Some(previous) => {
                    let previous = previous.to_string();
                    let (kept, discarded) = match options.duplicates {
                        DuplicatePolicy::LastWins => (value, previous),
                        DuplicatePolicy::FirstWins => (previous, value),
                        DuplicatePolicy::Reject => {
                            return Err(TransformError::ConflictingDuplicate {
                                code: code.to_string(),
                                field: field.to_string(),
                                first: previous,
                                second: value,
                            });
                        }
                    };
                    warn!(code, field, %kept, %discarded, "Conflicting values for duplicate code");
                    metadata.insert(field, kept.clone());
                    result.conflicts.push(FieldConflict {
                        code: code.to_string(),
                        field: field.to_string(),
                        kept,
                        discarded,
                    });
                }
            }
        }
    }

    debug!(
        codes = result.groups.len(),
        dropped = result.dropped.len(),
        conflicts = result.conflicts.len(),
        "Grouped derived rows"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::parser::SurveyTable;
    use crate::transform::dsl::{aggregate, ExtractOptions, ExtractionMatrix, Extractor};

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn derived(names: Vec<Cell>, genders: Vec<Cell>, projects: Vec<Cell>) -> DerivedTable {
        let table = SurveyTable::from_columns([
            ("name", names),
            ("gender", genders),
            ("projectid", projects),
        ]);
        let matrix = ExtractionMatrix::new()
            .with_field(SPEAKER_ID_FIELD, Extractor::Trimmed { column: "name".into() })
            .with_field("speaker-gender", Extractor::Value { column: "gender".into() })
            .with_field(PROJECT_FIELD, Extractor::Value { column: "projectid".into() });
        aggregate(&table, &matrix, &ExtractOptions::default()).unwrap()
    }

    #[test]
    fn test_one_entry_per_public_field() {
        let table = derived(vec![text("DEbi01MR")], vec![text("m")], vec![text("P1")]);
        let result = group_by_code(&table, &CodePattern::default(), &GroupOptions::default()).unwrap();

        let metadata = &result.groups["DEbi01MR"];
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.sorted_lines(),
            vec!["speaker-gender=m", "speaker-id=DEbi01MR"]
        );
    }

    #[test]
    fn test_null_and_invalid_codes_dropped() {
        let table = derived(
            vec![Cell::Null, text("bogus"), text("USmo02FE")],
            vec![text("m"), text("f"), text("f")],
            vec![Cell::Null, Cell::Null, Cell::Null],
        );
        let result = group_by_code(&table, &CodePattern::default(), &GroupOptions::default()).unwrap();

        assert_eq!(result.groups.len(), 1);
        assert!(result.groups.contains_key("USmo02FE"));
        assert_eq!(
            result.dropped,
            vec![
                DroppedRow { row: 0, code: None, reason: DropReason::MissingCode },
                DroppedRow {
                    row: 1,
                    code: Some("bogus".into()),
                    reason: DropReason::PatternMismatch
                },
            ]
        );
    }

    #[test]
    fn test_relaxed_mode_accepts_any_code() {
        let table = derived(
            vec![Cell::Null, text("bogus")],
            vec![text("m"), text("f")],
            vec![Cell::Null, Cell::Null],
        );
        let options = GroupOptions {
            relaxed: true,
            ..Default::default()
        };
        let result = group_by_code(&table, &CodePattern::default(), &options).unwrap();

        assert!(result.groups.contains_key("bogus"));
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].reason, DropReason::MissingCode);
    }

    #[test]
    fn test_identical_duplicates_collapse() {
        let table = derived(
            vec![text("DEbi01MR"), text("DEbi01MR")],
            vec![text("m"), text("m")],
            vec![Cell::Null, Cell::Null],
        );
        let result = group_by_code(&table, &CodePattern::default(), &GroupOptions::default()).unwrap();

        assert_eq!(result.groups["DEbi01MR"].len(), 2);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_last_wins_records_conflict() {
        let table = derived(
            vec![text("DEbi01MR"), text("DEbi01MR")],
            vec![text("m"), text("f")],
            vec![Cell::Null, Cell::Null],
        );
        let result = group_by_code(&table, &CodePattern::default(), &GroupOptions::default()).unwrap();

        assert_eq!(result.groups["DEbi01MR"].get("speaker-gender"), Some("f"));
        assert_eq!(
            result.conflicts,
            vec![FieldConflict {
                code: "DEbi01MR".into(),
                field: "speaker-gender".into(),
                kept: "f".into(),
                discarded: "m".into(),
            }]
        );
    }

    #[test]
    fn test_first_wins() {
        let table = derived(
            vec![text("DEbi01MR"), text("DEbi01MR")],
            vec![text("m"), text("f")],
            vec![Cell::Null, Cell::Null],
        );
        let options = GroupOptions {
            duplicates: DuplicatePolicy::FirstWins,
            ..Default::default()
        };
        let result = group_by_code(&table, &CodePattern::default(), &options).unwrap();

        assert_eq!(result.groups["DEbi01MR"].get("speaker-gender"), Some("m"));
        assert_eq!(result.conflicts.len(), 1);
    }

    #[test]
    fn test_reject_duplicates() {
        let table = derived(
            vec![text("DEbi01MR"), text("DEbi01MR")],
            vec![text("m"), text("f")],
            vec![Cell::Null, Cell::Null],
        );
        let options = GroupOptions {
            duplicates: DuplicatePolicy::Reject,
            ..Default::default()
        };
        let err = group_by_code(&table, &CodePattern::default(), &options).unwrap_err();
        assert!(matches!(err, TransformError::ConflictingDuplicate { .. }));
    }

    #[test]
    fn test_project_filter() {
        let table = derived(
            vec![text("DEbi01MR"), text("bogus")],
            vec![text("m"), text("f")],
            vec![text("P1"), text("P2")],
        );
        let options = GroupOptions {
            project: Some("P1".into()),
            ..Default::default()
        };
        let result = group_by_code(&table, &CodePattern::default(), &options).unwrap();

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.filtered, 1);
        // filtered rows are not validated
        assert!(result.dropped.is_empty());
    }
}
