//! Domain models for the conversion pipeline.
//!
//! - [`ParsedTable`] - headers + rows produced by the parser
//! - [`TargetColumn`] / [`TargetSchema`] - the YNAB column sets
//! - [`ColumnMapping`] - target column to source header
//! - [`Delimiter`] / [`ConversionOptions`] - parse settings
//! - [`NormalizedRow`] - one converted row

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::encoding;
use crate::error::ParseError;

// =============================================================================
// Parsed Table
// =============================================================================

/// One source row: header name to cell text.
///
/// Cells missing from a short record are absent, not empty strings.
pub type Row = HashMap<String, String>;

/// Result of parsing delimited text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTable {
    /// Unique header names in first-seen order.
    pub headers: Vec<String>,
    /// Data rows in source order.
    pub rows: Vec<Row>,
    /// Delimiter actually used (resolved when `auto` was requested).
    pub delimiter: char,
}

impl ParsedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

// =============================================================================
// Target Schema
// =============================================================================

/// A column of the YNAB import format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetColumn {
    Date,
    Payee,
    Memo,
    Outflow,
    Inflow,
    Amount,
}

impl TargetColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetColumn::Date => "Date",
            TargetColumn::Payee => "Payee",
            TargetColumn::Memo => "Memo",
            TargetColumn::Outflow => "Outflow",
            TargetColumn::Inflow => "Inflow",
            TargetColumn::Amount => "Amount",
        }
    }
}

impl fmt::Display for TargetColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(TargetColumn::Date),
            "payee" => Ok(TargetColumn::Payee),
            "memo" => Ok(TargetColumn::Memo),
            "outflow" => Ok(TargetColumn::Outflow),
            "inflow" => Ok(TargetColumn::Inflow),
            "amount" => Ok(TargetColumn::Amount),
            other => Err(format!("Unknown target column: {}", other)),
        }
    }
}

/// The output column set. Exactly one is active per conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSchema {
    /// Date, Payee, Memo, Outflow, Inflow
    #[default]
    Legacy,
    /// Date, Payee, Memo, Amount
    Unified,
}

const LEGACY_COLUMNS: [TargetColumn; 5] = [
    TargetColumn::Date,
    TargetColumn::Payee,
    TargetColumn::Memo,
    TargetColumn::Outflow,
    TargetColumn::Inflow,
];

const UNIFIED_COLUMNS: [TargetColumn; 4] = [
    TargetColumn::Date,
    TargetColumn::Payee,
    TargetColumn::Memo,
    TargetColumn::Amount,
];

impl TargetSchema {
    /// Columns in output order.
    pub fn columns(&self) -> &'static [TargetColumn] {
        match self {
            TargetSchema::Legacy => &LEGACY_COLUMNS,
            TargetSchema::Unified => &UNIFIED_COLUMNS,
        }
    }

    pub fn contains(&self, column: TargetColumn) -> bool {
        self.columns().contains(&column)
    }

    /// True when the schema splits amounts into Outflow and Inflow.
    pub fn has_flow_columns(&self) -> bool {
        self.contains(TargetColumn::Outflow) && self.contains(TargetColumn::Inflow)
    }

    /// The other variant.
    pub fn toggled(&self) -> Self {
        match self {
            TargetSchema::Legacy => TargetSchema::Unified,
            TargetSchema::Unified => TargetSchema::Legacy,
        }
    }

    pub fn all() -> [TargetSchema; 2] {
        [TargetSchema::Legacy, TargetSchema::Unified]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetSchema::Legacy => "legacy",
            TargetSchema::Unified => "unified",
        }
    }
}

impl FromStr for TargetSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "old" | "split" => Ok(TargetSchema::Legacy),
            "unified" | "new" | "amount" => Ok(TargetSchema::Unified),
            other => Err(format!("Unknown schema '{}': expected legacy or unified", other)),
        }
    }
}

// =============================================================================
// Column Mapping
// =============================================================================

/// Which source header feeds each target column.
///
/// Several target columns may point at the same header; Outflow and Inflow
/// sharing one header is the signed-amount split case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<TargetColumn, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every target column to the source header with the same name.
    pub fn identity(schema: TargetSchema) -> Self {
        schema
            .columns()
            .iter()
            .map(|c| (*c, c.as_str().to_string()))
            .collect()
    }

    pub fn with(mut self, column: TargetColumn, source: impl Into<String>) -> Self {
        self.set(column, source);
        self
    }

    pub fn set(&mut self, column: TargetColumn, source: impl Into<String>) {
        self.0.insert(column, source.into());
    }

    pub fn unset(&mut self, column: TargetColumn) {
        self.0.remove(&column);
    }

    pub fn get(&self, column: TargetColumn) -> Option<&str> {
        self.0.get(&column).map(String::as_str)
    }

    /// True when Outflow and Inflow read the same source header.
    pub fn is_split(&self) -> bool {
        match (self.get(TargetColumn::Outflow), self.get(TargetColumn::Inflow)) {
            (Some(out), Some(inflow)) => out == inflow,
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetColumn, &str)> {
        self.0.iter().map(|(c, s)| (*c, s.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(TargetColumn, String)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (TargetColumn, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Conversion Options
// =============================================================================

/// Field delimiter choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Delimiter {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = ",")]
    Comma,
    #[serde(rename = ";")]
    Semicolon,
    #[serde(rename = "|")]
    Pipe,
}

impl Delimiter {
    /// The catalog offered to users, in display order.
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Auto,
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Pipe,
    ];

    /// The explicit character, `None` for auto-detection.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Delimiter::Auto => None,
            Delimiter::Comma => Some(','),
            Delimiter::Semicolon => Some(';'),
            Delimiter::Pipe => Some('|'),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Auto => "auto",
            Delimiter::Comma => ",",
            Delimiter::Semicolon => ";",
            Delimiter::Pipe => "|",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Delimiter::Auto),
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            "|" | "pipe" => Ok(Delimiter::Pipe),
            other => Err(format!(
                "Unsupported delimiter '{}': expected auto, ',', ';' or '|'",
                other
            )),
        }
    }
}

/// Settings applied before each parse.
///
/// Changing any of them means re-parsing from the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    pub delimiter: Delimiter,
    /// Name from [`encoding::ENCODINGS`], or `auto`.
    pub encoding: String,
    /// 1-based line where the header row starts.
    pub start_row: usize,
    /// Parse the first remaining line both as header and as first data row.
    pub duplicate_first_row: bool,
    pub invert_sign: bool,
    /// Zero-based worksheet, spreadsheets only.
    pub worksheet_index: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Auto,
            encoding: encoding::DEFAULT_ENCODING.to_string(),
            start_row: 1,
            duplicate_first_row: false,
            invert_sign: false,
            worksheet_index: 0,
        }
    }
}

impl ConversionOptions {
    /// Reject values outside the catalogs.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.start_row < 1 {
            return Err(ParseError::InvalidStartRow(self.start_row));
        }
        if !encoding::is_supported(&self.encoding) {
            return Err(ParseError::UnsupportedEncoding(self.encoding.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// Normalized Row
// =============================================================================

/// One converted row. Only columns with a non-empty value are present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedRow(BTreeMap<TargetColumn, String>);

impl NormalizedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` unless it is empty.
    pub fn insert(&mut self, column: TargetColumn, value: &str) {
        if !value.is_empty() {
            self.0.insert(column, value.to_string());
        }
    }

    pub fn get(&self, column: TargetColumn) -> Option<&str> {
        self.0.get(&column).map(String::as_str)
    }

    pub fn contains(&self, column: TargetColumn) -> bool {
        self.0.contains_key(&column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetColumn, &str)> {
        self.0.iter().map(|(c, v)| (*c, v.as_str()))
    }
}

impl<const N: usize> From<[(TargetColumn, &str); N]> for NormalizedRow {
    fn from(pairs: [(TargetColumn, &str); N]) -> Self {
        let mut row = NormalizedRow::new();
        for (column, value) in pairs {
            row.insert(column, value);
        }
        row
    }
}
