//! Domain models for the surveymeta pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Cell`] - A single survey answer (null, text or calendar date)
//! - [`FieldValue`] - A derived metadata value
//! - [`CodePattern`] - The participant code convention
//! - [`CodeParts`] - A participant code broken into its components
//! - [`MetadataSet`] - The core `key=value` entries of one participant

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Survey Cells
// =============================================================================

/// One answer in the survey table.
///
/// Empty CSV fields are loaded as [`Cell::Null`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    /// Build a text cell, mapping empty input to `Null`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date content, if this is a date cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }
}

// =============================================================================
// Derived Values
// =============================================================================

/// A value in the derived table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&Cell> for FieldValue {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Null => FieldValue::Null,
            Cell::Text(s) => FieldValue::Text(s.clone()),
            Cell::Date(d) => FieldValue::Text(d.to_string()),
        }
    }
}

/// Serialized form used in `.meta` files.
///
/// Booleans keep the `True`/`False` spelling existing corpora were built
/// with; nulls become an empty value.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Bool(true) => f.write_str("True"),
            FieldValue::Bool(false) => f.write_str("False"),
        }
    }
}

// =============================================================================
// Participant Codes
// =============================================================================

/// Canonical participant code pattern.
///
/// Country codes accept either case for their second letter (`DE`, `De`);
/// everything else is case-sensitive.
pub const CODE_PATTERN: &str = r"(D[Ee]|U[Ss]|R[Uu]|G[Rr]|T[Rr])(bi|mo)([0-9]{2})(M|F)(R|G|D|E|T)";

static CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{CODE_PATTERN}$")).expect("Invalid embedded code pattern")
});

/// Matcher for participant codes such as `DEbi07FR`.
#[derive(Debug, Clone)]
pub struct CodePattern {
    regex: Regex,
}

impl Default for CodePattern {
    fn default() -> Self {
        Self {
            regex: CODE_REGEX.clone(),
        }
    }
}

impl CodePattern {
    /// Whether `code` is a complete, valid participant code.
    pub fn is_match(&self, code: &str) -> bool {
        self.regex.is_match(code)
    }

    /// Break a valid code into its components.
    pub fn parts(&self, code: &str) -> Option<CodeParts> {
        let caps = self.regex.captures(code)?;
        let letter = |i: usize| caps.get(i).and_then(|m| m.as_str().chars().next());
        Some(CodeParts {
            country: caps.get(1)?.as_str().to_uppercase(),
            bilingual: caps.get(2)?.as_str() == "bi",
            number: caps.get(3)?.as_str().parse().ok()?,
            gender: letter(4)?,
            relation: letter(5)?,
        })
    }
}

/// Components of a participant code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeParts {
    /// Country of elicitation, upper-cased (`DE`, `US`, ...).
    pub country: String,
    /// `bi` (true) or `mo` (false).
    pub bilingual: bool,
    pub number: u8,
    /// `M` or `F`.
    pub gender: char,
    /// Language relation letter (`R`, `G`, `D`, `E`, `T`).
    pub relation: char,
}

// =============================================================================
// Metadata Entries
// =============================================================================

/// Core metadata of one participant: output field name to serialized value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataSet {
    entries: BTreeMap<String, String>,
}

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(String::as_str)
    }

    /// Set `field`, returning the previous value if there was one.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(field.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `key=value` lines in lexicographic order of the whole line.
    ///
    /// Sorting the joined line differs from sorting by key:
    /// `speaker-age-group=…` precedes `speaker-age=…`.
    pub fn sorted_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| entry_line(k, v))
            .collect();
        lines.sort();
        lines
    }
}

/// Format one `key=value` entry.
pub fn entry_line(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_raw() {
        assert_eq!(Cell::from_raw(""), Cell::Null);
        assert_eq!(Cell::from_raw("x").as_text(), Some("x"));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Bool(true).to_string(), "True");
        assert_eq!(FieldValue::Bool(false).to_string(), "False");
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::text("de").to_string(), "de");
    }

    #[test]
    fn test_code_pattern_accepts_valid_codes() {
        let pattern = CodePattern::default();
        assert!(pattern.is_match("DEbi01MR"));
        assert!(pattern.is_match("Demo42FG"));
        assert!(pattern.is_match("TRmo99FT"));
    }

    #[test]
    fn test_code_pattern_rejects_invalid_codes() {
        let pattern = CodePattern::default();
        assert!(!pattern.is_match("dEbi01MR"));
        assert!(!pattern.is_match("DEBI01MR"));
        assert!(!pattern.is_match("FRbi01MR"));
        assert!(!pattern.is_match("DEbi1MR"));
        assert!(!pattern.is_match("DEbi01XR"));
        assert!(!pattern.is_match("DEbi01MRx"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn test_code_parts() {
        let parts = CodePattern::default().parts("Usmo07FE").unwrap();
        assert_eq!(parts.country, "US");
        assert!(!parts.bilingual);
        assert_eq!(parts.number, 7);
        assert_eq!(parts.gender, 'F');
        assert_eq!(parts.relation, 'E');
    }

    #[test]
    fn test_sorted_lines_sort_whole_line() {
        let mut set = MetadataSet::new();
        set.insert("speaker-age", "30");
        set.insert("speaker-age-group", "adult");
        set.insert("elicitation-country", "Germany");
        assert_eq!(
            set.sorted_lines(),
            vec![
                "elicitation-country=Germany",
                "speaker-age-group=adult",
                "speaker-age=30",
            ]
        );
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut set = MetadataSet::new();
        assert_eq!(set.insert("speaker-gender", "m"), None);
        assert_eq!(set.insert("speaker-gender", "f"), Some("m".to_string()));
        assert_eq!(set.get("speaker-gender"), Some("f"));
        assert_eq!(set.len(), 1);
    }
}
