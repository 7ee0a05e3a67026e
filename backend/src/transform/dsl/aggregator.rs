//! Row aggregation
//!
//! Runs every rule of an extraction matrix over the survey table and
//! collects the results into a [`DerivedTable`]. No rows are filtered here.

use tracing::debug;

use super::extractors::ExtractOptions;
use super::matrix::ExtractionMatrix;
use crate::error::{TransformError, TransformResult};
use crate::models::FieldValue;
use crate::parser::SurveyTable;

/// One derived column per matrix rule, in matrix order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTable {
    fields: Vec<String>,
    columns: Vec<Vec<FieldValue>>,
    rows: usize,
}

impl DerivedTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Field names in matrix order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn column(&self, field: &str) -> Option<&[FieldValue]> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| self.columns[i].as_slice())
    }

    /// `(field, value)` pairs of one row, in matrix order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .zip(&self.columns)
            .filter_map(move |(f, c)| c.get(index).map(|v| (f.as_str(), v)))
    }

    fn push(&mut self, field: String, values: Vec<FieldValue>) -> TransformResult<()> {
        if !self.fields.is_empty() && values.len() != self.rows {
            return Err(TransformError::InvalidMatrix(format!(
                "field '{field}' produced {} values for {} rows",
                values.len(),
                self.rows
            )));
        }
        self.rows = values.len();
        self.fields.push(field);
        self.columns.push(values);
        Ok(())
    }
}

/// Apply every extractor of `matrix` to `table`.
///
/// # Arguments
/// * `table` - The loaded survey answers
/// * `matrix` - The extraction rules, validated against `table` first
/// * `options` - Settings shared by all extractors
///
/// # Returns
/// A derived table with one row per survey row
pub fn aggregate(
    table: &SurveyTable,
    matrix: &ExtractionMatrix,
    options: &ExtractOptions,
) -> TransformResult<DerivedTable> {
    matrix.validate(table)?;

    let mut derived = DerivedTable::default();
    for rule in &matrix.fields {
        let values = rule.extractor.extract(&rule.field, table, options)?;
        debug!(field = %rule.field, rows = values.len(), "Extracted field");
        derived.push(rule.field.clone(), values)?;
    }
    Ok(derived)
}
