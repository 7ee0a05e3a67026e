//! Field extractors
//!
//! Each extractor reads the whole survey table and yields one value per row,
//! aligned by row position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::error::{TransformError, TransformResult};
use crate::models::{Cell, FieldValue};
use crate::parser::SurveyTable;

/// Value written for a missing age of onset or an unscorable TIPI pair.
pub const NOT_AVAILABLE: &str = "n/a";

/// Label for tables whose questionnaire has the adult-only marker column.
pub const ADULT: &str = "adult";

/// Label for every other table.
pub const CHILD_ADOLESCENT: &str = "child/adolescent";

/// Upper bound for `speaker-age`, in years.
pub const MAX_AGE: i32 = 200;

/// All available extraction rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Extractor {
    /// Column value with surrounding whitespace removed; blank becomes null
    Trimmed { column: String },

    /// Column value unchanged
    Value { column: String },

    /// Column value, or `fallback` when the answer is missing
    ValueOr { column: String, fallback: String },

    /// `true` when the column has an answer
    Answered { column: String },

    /// Date column as `day.month.year` without zero padding
    DayMonthYear { column: String },

    /// Unique, title-cased, sorted answers of several columns joined by `", "`
    LanguageList { columns: Vec<String> },

    /// Whole-table label: adult if `marker` is a column of the export.
    ///
    /// The questionnaire for children and adolescents has no such question,
    /// so this looks at the table, not at individual rows.
    AgeGroup { marker: String },

    /// Full years between birth and submission, by year and month only
    Age { submitted: String, born: String },

    /// Ten-Item Personality Inventory trait score from one item and one
    /// reverse-scored item
    Tipi { item: String, reversed_item: String },
}

/// What to do with a TIPI item that has no usable answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingResponsePolicy {
    /// Score it as "Neither agree nor disagree" (4).
    #[default]
    Neutral,
    /// Write `n/a` for the trait.
    NotAvailable,
}

/// Settings shared by all extractors of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    #[serde(default)]
    pub tipi_missing: MissingResponsePolicy,
}

impl Extractor {
    /// Columns that must exist for this extractor to run.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Extractor::Trimmed { column }
            | Extractor::Value { column }
            | Extractor::ValueOr { column, .. }
            | Extractor::Answered { column }
            | Extractor::DayMonthYear { column } => vec![column.as_str()],
            Extractor::LanguageList { columns } => columns.iter().map(String::as_str).collect(),
            // presence is the answer
            Extractor::AgeGroup { .. } => Vec::new(),
            Extractor::Age { submitted, born } => vec![submitted.as_str(), born.as_str()],
            Extractor::Tipi {
                item,
                reversed_item,
            } => vec![item.as_str(), reversed_item.as_str()],
        }
    }

    /// Columns this extractor reads as calendar dates.
    pub fn date_columns(&self) -> Vec<&str> {
        match self {
            Extractor::DayMonthYear { column } => vec![column.as_str()],
            Extractor::Age { submitted, born } => vec![submitted.as_str(), born.as_str()],
            _ => Vec::new(),
        }
    }

    /// Run the extractor over `table`, producing `field`'s column.
    pub fn extract(
        &self,
        field: &str,
        table: &SurveyTable,
        options: &ExtractOptions,
    ) -> TransformResult<Vec<FieldValue>> {
        let values = match self {
            Extractor::Trimmed { column: name } => lookup(table, field, name)?
                .iter()
                .map(|cell| match cell.as_text().map(str::trim) {
                    Some(s) if !s.is_empty() => FieldValue::text(s),
                    _ => FieldValue::Null,
                })
                .collect(),

            Extractor::Value { column: name } => lookup(table, field, name)?
                .iter()
                .map(FieldValue::from)
                .collect(),

            Extractor::ValueOr {
                column: name,
                fallback,
            } => lookup(table, field, name)?
                .iter()
                .map(|cell| match cell {
                    Cell::Null => FieldValue::text(fallback.as_str()),
                    other => FieldValue::from(other),
                })
                .collect(),

            Extractor::Answered { column: name } => lookup(table, field, name)?
                .iter()
                .map(|cell| FieldValue::Bool(!cell.is_null()))
                .collect(),

            Extractor::DayMonthYear { column: name } => lookup(table, field, name)?
                .iter()
                .map(|cell| match cell.as_date() {
                    Some(date) => FieldValue::Text(day_month_year(date)),
                    None => FieldValue::Null,
                })
                .collect(),

            Extractor::LanguageList { columns } => {
                let sources = columns
                    .iter()
                    .map(|name| lookup(table, field, name))
                    .collect::<TransformResult<Vec<_>>>()?;
                (0..table.len())
                    .map(|row| FieldValue::Text(language_list(sources.iter().map(|c| &c[row]))))
                    .collect()
            }

            Extractor::AgeGroup { marker } => {
                let label = if table.has_column(marker) {
                    ADULT
                } else {
                    CHILD_ADOLESCENT
                };
                vec![FieldValue::text(label); table.len()]
            }

            Extractor::Age { submitted, born } => {
                let submitted = lookup(table, field, submitted)?;
                let born = lookup(table, field, born)?;
                submitted
                    .iter()
                    .zip(born)
                    .map(|(s, b)| {
                        let age = match (s.as_date(), b.as_date()) {
                            (Some(s), Some(b)) => age_in_years(s, b),
                            _ => 0,
                        };
                        FieldValue::Text(age.to_string())
                    })
                    .collect()
            }

            Extractor::Tipi {
                item,
                reversed_item,
            } => {
                let items = lookup(table, field, item)?;
                let reversed = lookup(table, field, reversed_item)?;
                items
                    .iter()
                    .zip(reversed)
                    .enumerate()
                    .map(|(row, (a, b))| {
                        let a = tipi_item(a, item, row);
                        let b = tipi_item(b, reversed_item, row);
                        tipi_score(a, b, options.tipi_missing)
                    })
                    .collect()
            }
        };

        Ok(values)
    }
}

fn lookup<'t>(table: &'t SurveyTable, field: &str, column: &str) -> TransformResult<&'t [Cell]> {
    table.column(column).ok_or_else(|| TransformError::MissingColumn {
        field: field.to_string(),
        column: column.to_string(),
    })
}

// =============================================================================
// Value helpers
// =============================================================================

/// `7.3.2019` style date.
pub fn day_month_year(date: chrono::NaiveDate) -> String {
    use chrono::Datelike;
    format!("{}.{}.{}", date.day(), date.month(), date.year())
}

/// Upper-case the first letter of every word, lower-case the rest.
///
/// A word is a run of letters, so `north-german` becomes `North-German`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn language_list<'a>(cells: impl Iterator<Item = &'a Cell>) -> String {
    let languages: BTreeSet<String> = cells
        .filter_map(Cell::as_text)
        .map(|s| title_case(s.trim()))
        .filter(|s| !s.is_empty())
        .collect();
    languages.into_iter().collect::<Vec<_>>().join(", ")
}

/// Age from year and month of both dates, clamped to `[0, MAX_AGE]`.
pub fn age_in_years(submitted: chrono::NaiveDate, born: chrono::NaiveDate) -> i32 {
    use chrono::Datelike;
    let months = (submitted.year() - born.year()) * 12 + submitted.month() as i32 - born.month() as i32;
    months.div_euclid(12).clamp(0, MAX_AGE)
}

// =============================================================================
// TIPI
// =============================================================================

/// Score of "Neither agree nor disagree".
pub const NEUTRAL_SCORE: u8 = 4;

/// Map a 7-point agreement answer to 1..=7.
pub fn agreement_score(answer: &str) -> Option<u8> {
    const SCALE: [&str; 7] = [
        "Disagree strongly",
        "Disagree moderately",
        "Disagree a little",
        "Neither agree nor disagree",
        "Agree a little",
        "Agree moderately",
        "Agree strongly",
    ];
    let answer = answer.trim();
    SCALE
        .iter()
        .position(|s| s.eq_ignore_ascii_case(answer))
        .map(|i| i as u8 + 1)
}

fn tipi_item(cell: &Cell, column: &str, row: usize) -> Option<u8> {
    let answer = cell.as_text()?;
    let score = agreement_score(answer);
    if score.is_none() {
        warn!(column, row, answer, "Unknown agreement answer, treated as missing");
    }
    score
}

/// Mean of `item` and the reverse-scored `reversed`, as `"<mean>/7"`.
pub fn tipi_score(item: Option<u8>, reversed: Option<u8>, policy: MissingResponsePolicy) -> FieldValue {
    let (item, reversed) = match (item, reversed, policy) {
        (Some(a), Some(b), _) => (a, b),
        (_, _, MissingResponsePolicy::NotAvailable) => return FieldValue::text(NOT_AVAILABLE),
        (a, b, MissingResponsePolicy::Neutral) => {
            (a.unwrap_or(NEUTRAL_SCORE), b.unwrap_or(NEUTRAL_SCORE))
        }
    };
    let mean = (f64::from(item) + 8.0 - f64::from(reversed)) / 2.0;
    if mean.fract() == 0.0 {
        FieldValue::Text(format!("{}/7", mean as u8))
    } else {
        FieldValue::Text(format!("{mean}/7"))
    }
}
