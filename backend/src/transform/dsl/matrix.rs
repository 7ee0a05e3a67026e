//! Extraction Matrix definition
//!
//! The matrix defines how survey columns become `.meta` fields: an ordered
//! list of output field names, each with one extraction rule.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::extractors::{Extractor, NOT_AVAILABLE};
use crate::error::{TransformError, TransformResult};
use crate::parser::{ColumnKind, ColumnSpec, SurveySchema, SurveyTable};

/// Output field holding the participant code.
pub const SPEAKER_ID_FIELD: &str = "speaker-id";

/// Output field holding the survey project, used for filtering only.
pub const PROJECT_FIELD: &str = "_project";

/// Fields starting with this prefix are never written to `.meta` files.
pub const INTERNAL_PREFIX: char = '_';

/// Whether `field` is internal (kept in the derived table, never written).
pub fn is_internal(field: &str) -> bool {
    field.starts_with(INTERNAL_PREFIX)
}

/// A complete extraction matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMatrix {
    /// Version of the matrix format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Field rules in output order
    pub fields: Vec<FieldRule>,
}

/// Extraction rule for a single output field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Output field name (`speaker-age`, `_project`, ...)
    pub field: String,

    #[serde(flatten)]
    pub extractor: Extractor,
}

impl FieldRule {
    pub fn new(field: impl Into<String>, extractor: Extractor) -> Self {
        Self {
            field: field.into(),
            extractor,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ExtractionMatrix {
    /// Create an empty matrix
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            fields: Vec::new(),
        }
    }

    /// Append a rule
    pub fn with_field(mut self, field: impl Into<String>, extractor: Extractor) -> Self {
        self.fields.push(FieldRule::new(field, extractor));
        self
    }

    /// Parse a matrix from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get all source columns referenced in the matrix
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .fields
            .iter()
            .flat_map(|r| r.extractor.columns())
            .map(String::from)
            .collect();

        columns.sort();
        columns.dedup();
        columns
    }

    /// Schema an export must satisfy for this matrix.
    ///
    /// Every source column is required. Columns read by a date extractor
    /// are parsed as dates at load time; age-group markers are optional.
    pub fn schema(&self) -> SurveySchema {
        let dates: HashSet<&str> = self
            .fields
            .iter()
            .flat_map(|r| r.extractor.date_columns())
            .collect();

        let mut columns: Vec<ColumnSpec> = self
            .source_columns()
            .into_iter()
            .map(|name| {
                let kind = if dates.contains(name.as_str()) {
                    ColumnKind::Date
                } else {
                    ColumnKind::Text
                };
                ColumnSpec::required(name, kind)
            })
            .collect();

        for rule in &self.fields {
            if let Extractor::AgeGroup { marker } = &rule.extractor {
                if !columns.iter().any(|c| &c.name == marker) {
                    columns.push(ColumnSpec::optional(marker.as_str(), ColumnKind::Presence));
                }
            }
        }
        SurveySchema { columns }
    }

    /// Output field names in order
    pub fn output_fields(&self) -> Vec<&str> {
        self.fields.iter().map(|r| r.field.as_str()).collect()
    }

    /// Check the matrix itself: non-empty unique field names and a speaker id.
    pub fn check(&self) -> TransformResult<()> {
        let mut seen = HashSet::new();
        for rule in &self.fields {
            if rule.field.is_empty() {
                return Err(TransformError::InvalidMatrix("empty field name".into()));
            }
            if !seen.insert(rule.field.as_str()) {
                return Err(TransformError::InvalidMatrix(format!(
                    "field '{}' is defined twice",
                    rule.field
                )));
            }
        }
        if !seen.contains(SPEAKER_ID_FIELD) {
            return Err(TransformError::InvalidMatrix(format!(
                "no '{SPEAKER_ID_FIELD}' field"
            )));
        }
        Ok(())
    }

    /// Check the matrix against a loaded table before anything runs.
    ///
    /// The first rule referencing an absent column is reported.
    pub fn validate(&self, table: &SurveyTable) -> TransformResult<()> {
        self.check()?;
        for rule in &self.fields {
            if let Some(column) = rule
                .extractor
                .columns()
                .into_iter()
                .find(|c| !table.has_column(c))
            {
                return Err(TransformError::MissingColumn {
                    field: rule.field.clone(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ExtractionMatrix {
    fn default() -> Self {
        rueg_matrix()
    }
}

/// TIPI traits and their (item, reverse-scored item) questions.
const TIPI_TRAITS: [(&str, &str, &str); 5] = [
    ("extraversion", "character[CH1]", "character[CH6]"),
    ("aggreeableness", "character[CH2]", "character[CH7]"),
    ("conscientiousness", "character[CH3]", "character[CH8]"),
    ("emotional-stability", "character[CH4]", "character[CH9]"),
    ("openness", "character[CH5]", "character[CH10]"),
];

/// Matrix for the RUEG speaker questionnaire.
pub fn rueg_matrix() -> ExtractionMatrix {
    let column = |c: &str| c.to_string();

    let mut languages = vec![
        column("lmaj"),
        column("languagesmh[LHER_LCHN]"),
        column("languagesmh[LHERA_LCHN]"),
    ];
    languages.extend((31..=35).map(|i| format!("languages[L{i}]")));

    let mut matrix = ExtractionMatrix::new()
        .with_field(SPEAKER_ID_FIELD, Extractor::Trimmed { column: column("name") })
        .with_field(
            "speaker-bilingual",
            Extractor::Answered {
                column: column("languagesmh[LHER_LCHN]"),
            },
        )
        .with_field(
            "elicitation-country",
            Extractor::Value {
                column: column("countryelicitation"),
            },
        )
        .with_field(
            "elicitation-date",
            Extractor::DayMonthYear {
                column: column("datestamp"),
            },
        )
        .with_field("speaker-language-s", Extractor::LanguageList { columns: languages })
        .with_field(
            "speaker-age-group",
            Extractor::AgeGroup {
                marker: column("jobstatus"),
            },
        )
        .with_field("speaker-gender", Extractor::Value { column: column("gender") })
        .with_field(
            "speaker-age",
            Extractor::Age {
                submitted: column("datestamp"),
                born: column("dateofbirth"),
            },
        )
        .with_field(
            "speaker-AoO",
            Extractor::ValueOr {
                column: column("languagesmh[LHERA_LCHT]"),
                fallback: NOT_AVAILABLE.to_string(),
            },
        );

    for (name, item, reversed_item) in TIPI_TRAITS {
        matrix = matrix.with_field(
            format!("speaker-personality-score-{name}"),
            Extractor::Tipi {
                item: column(item),
                reversed_item: column(reversed_item),
            },
        );
    }

    matrix = matrix.with_field(PROJECT_FIELD, Extractor::Value { column: column("projectid") });
    matrix.description = "RUEG speaker questionnaire to PepperMeta fields".to_string();
    matrix
}
