//! Survey export loading with encoding auto-detection.
//!
//! The questionnaire export is a delimited text table with one row per
//! response. Rows are stored column-wise in a [`SurveyTable`] after being
//! checked once against an explicit [`SurveySchema`]: required columns must
//! exist, date columns are parsed into calendar dates.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{CsvError, CsvResult};
use crate::models::Cell;

// =============================================================================
// Schema
// =============================================================================

/// How a column's raw text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Kept as text.
    Text,
    /// Parsed into a calendar date.
    Date,
    /// Only the column's existence matters.
    Presence,
}

/// One column the schema knows about.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub required: bool,
}

impl ColumnSpec {
    pub fn required(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// The set of columns a survey export is validated against.
///
/// Columns present in the file but unknown to the schema are kept as text.
#[derive(Debug, Clone, Default)]
pub struct SurveySchema {
    pub columns: Vec<ColumnSpec>,
}

impl SurveySchema {
    /// Schema of the RUEG speaker questionnaire.
    pub fn rueg() -> Self {
        let mut columns = vec![
            ColumnSpec::required("name", ColumnKind::Text),
            ColumnSpec::required("datestamp", ColumnKind::Date),
            ColumnSpec::required("dateofbirth", ColumnKind::Date),
            ColumnSpec::required("countryelicitation", ColumnKind::Text),
            ColumnSpec::required("gender", ColumnKind::Text),
            ColumnSpec::optional("jobstatus", ColumnKind::Presence),
            ColumnSpec::required("lmaj", ColumnKind::Text),
            ColumnSpec::required("languagesmh[LHER_LCHN]", ColumnKind::Text),
            ColumnSpec::required("languagesmh[LHERA_LCHN]", ColumnKind::Text),
            ColumnSpec::required("languagesmh[LHERA_LCHT]", ColumnKind::Text),
        ];
        columns.extend(
            (31..=35).map(|i| ColumnSpec::required(format!("languages[L{i}]"), ColumnKind::Text)),
        );
        columns.extend(
            (1..=10).map(|i| ColumnSpec::required(format!("character[CH{i}]"), ColumnKind::Text)),
        );
        columns.push(ColumnSpec::required("projectid", ColumnKind::Text));
        Self { columns }
    }

    fn kind_of(&self, name: &str) -> ColumnKind {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
            .unwrap_or(ColumnKind::Text)
    }

    /// Fail on the first required column missing from `headers`.
    pub fn check_headers(&self, headers: &[String]) -> CsvResult<()> {
        for spec in self.columns.iter().filter(|c| c.required) {
            if !headers.iter().any(|h| h == &spec.name) {
                return Err(CsvError::MissingColumn(spec.name.clone()));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Table
// =============================================================================

/// Survey answers stored column by column, in file order.
#[derive(Debug, Clone, Default)]
pub struct SurveyTable {
    headers: Vec<String>,
    columns: Vec<Vec<Cell>>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl SurveyTable {
    /// Build a table from named columns. Short columns are padded with nulls.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Cell>)>,
        S: Into<String>,
    {
        let mut table = SurveyTable::default();
        for (name, cells) in columns {
            table.push_column(name.into(), cells);
        }
        let rows = table.rows;
        for column in &mut table.columns {
            column.resize(rows, Cell::Null);
        }
        table
    }

    fn push_column(&mut self, name: String, cells: Vec<Cell>) {
        self.rows = self.rows.max(cells.len());
        // First occurrence wins for duplicated headers.
        self.index.entry(name.clone()).or_insert(self.columns.len());
        self.headers.push(name);
        self.columns.push(cells);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All cells of the named column, one per row.
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Valid UTF-8 always wins, whatever the detector guessed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(s.to_string());
    }
    match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
        Some(enc) => {
            let (decoded, used, had_errors) = enc.decode(bytes);
            if had_errors {
                warn!(encoding = used.name(), "Replaced undecodable bytes in survey export");
            }
            Ok(decoded.into_owned())
        }
        None => Err(CsvError::EncodingError(format!(
            "unknown encoding '{encoding}' and input is not UTF-8"
        ))),
    }
}

// =============================================================================
// Dates
// =============================================================================

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Parse a survey timestamp or date into a calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        })
}

// =============================================================================
// Parsing
// =============================================================================

/// Load a survey export from disk with encoding auto-detection.
pub fn load_survey<P: AsRef<Path>>(
    path: P,
    delimiter: char,
    schema: &SurveySchema,
) -> CsvResult<SurveyTable> {
    let bytes = std::fs::read(path.as_ref())?;
    let encoding = detect_encoding(&bytes);
    debug!(path = %path.as_ref().display(), %encoding, "Read survey export");
    let content = decode_content(&bytes, &encoding)?;
    parse_survey_str(&content, delimiter, schema)
}

/// Parse an in-memory survey export.
pub fn parse_survey_str(
    content: &str,
    delimiter: char,
    schema: &SurveySchema,
) -> CsvResult<SurveyTable> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("delimiter '{delimiter}' is not a single ASCII character"),
        })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(CsvError::NoHeaders);
    }
    schema.check_headers(&headers)?;

    let kinds: Vec<ColumnKind> = headers.iter().map(|h| schema.kind_of(h)).collect();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        for (i, column) in columns.iter_mut().enumerate() {
            let raw = record.get(i).unwrap_or("");
            column.push(to_cell(raw, kinds[i], &headers[i], line));
        }
    }

    let table = SurveyTable::from_columns(headers.into_iter().zip(columns));
    debug!(rows = table.len(), columns = table.headers().len(), "Parsed survey export");
    Ok(table)
}

fn to_cell(raw: &str, kind: ColumnKind, column: &str, line: u64) -> Cell {
    match kind {
        ColumnKind::Text | ColumnKind::Presence => Cell::from_raw(raw),
        ColumnKind::Date if raw.trim().is_empty() => Cell::Null,
        ColumnKind::Date => match parse_date(raw) {
            Some(date) => Cell::Date(date),
            None => {
                warn!(column, line, value = raw, "Unparseable date, treated as missing");
                Cell::Null
            }
        },
    }
}

fn csv_error(e: csv::Error) -> CsvError {
    CsvError::ParseError {
        line: e.position().map(|p| p.line()).unwrap_or(0),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_schema() -> SurveySchema {
        SurveySchema {
            columns: vec![
                ColumnSpec::required("name", ColumnKind::Text),
                ColumnSpec::required("datestamp", ColumnKind::Date),
                ColumnSpec::optional("jobstatus", ColumnKind::Presence),
            ],
        }
    }

    #[test]
    fn test_simple_csv() {
        let csv = "name,datestamp\nDEbi01MR,2019-03-07 10:12:00\nUSmo02FE,2019-04-01";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();

        assert_eq!(table.len(), 2);
        let names = table.column("name").unwrap();
        assert_eq!(names[0].as_text(), Some("DEbi01MR"));
        let dates = table.column("datestamp").unwrap();
        assert_eq!(dates[0].as_date(), NaiveDate::from_ymd_opt(2019, 3, 7));
        assert_eq!(dates[1].as_date(), NaiveDate::from_ymd_opt(2019, 4, 1));
    }

    #[test]
    fn test_empty_fields_are_null() {
        let csv = "name,datestamp,extra\n,,\nx,2019-01-01,y";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();

        assert!(table.column("name").unwrap()[0].is_null());
        assert!(table.column("datestamp").unwrap()[0].is_null());
        assert_eq!(table.column("extra").unwrap()[1].as_text(), Some("y"));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,datestamp,note\n\"DEbi01MR\",2019-01-01,\"a, b\nc\"";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.column("note").unwrap()[0].as_text(), Some("a, b\nc"));
    }

    #[test]
    fn test_short_rows_padded() {
        let csv = "name,datestamp,extra\nx";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();

        assert!(table.column("extra").unwrap()[0].is_null());
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "name,other\nx,y";
        let err = parse_survey_str(csv, ',', &minimal_schema()).unwrap_err();
        assert!(matches!(err, CsvError::MissingColumn(ref c) if c == "datestamp"));
    }

    #[test]
    fn test_optional_column_may_be_absent() {
        let csv = "name,datestamp\nx,2019-01-01";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();
        assert!(!table.has_column("jobstatus"));
    }

    #[test]
    fn test_unparseable_date_is_null() {
        let csv = "name,datestamp\nx,someday";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();
        assert!(table.column("datestamp").unwrap()[0].is_null());
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse_survey_str("", ',', &minimal_schema());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_bom_stripped() {
        let csv = "\u{feff}name,datestamp\nx,2019-01-01";
        let table = parse_survey_str(csv, ',', &minimal_schema()).unwrap();
        assert!(table.has_column("name"));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let csv = "name;datestamp\nx;01.02.2020";
        let table = parse_survey_str(csv, ';', &minimal_schema()).unwrap();
        assert_eq!(
            table.column("datestamp").unwrap()[0].as_date(),
            NaiveDate::from_ymd_opt(2020, 2, 1)
        );
    }

    #[test]
    fn test_rueg_schema_lists_all_items() {
        let schema = SurveySchema::rueg();
        assert!(schema.columns.iter().any(|c| c.name == "character[CH10]"));
        assert!(schema.columns.iter().any(|c| c.name == "languages[L35]"));
        let jobstatus = schema.columns.iter().find(|c| c.name == "jobstatus").unwrap();
        assert!(!jobstatus.required);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_load_survey_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(&path, "name,datestamp\nDEbi01MR,2019-03-07\n").unwrap();

        let table = load_survey(&path, ',', &minimal_schema()).unwrap();
        assert_eq!(table.len(), 1);
    }
}
