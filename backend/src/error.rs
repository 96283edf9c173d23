//! Error types for the conversion pipeline.
//!
//! - [`ParseError`] - delimited text could not be turned into a table
//! - [`WorkbookError`] - a spreadsheet or one of its worksheets is unusable
//! - [`ConvertError`] - top-level pipeline errors (wraps the two above)
//! - [`ProfileError`] - profile store errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while parsing delimited text into a [`crate::models::ParsedTable`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Start row is 1-based.
    #[error("Start row must be at least 1, got {0}")]
    InvalidStartRow(usize),

    /// Encoding name is not part of the catalog.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Nothing left once the leading rows were dropped.
    #[error("No content left after skipping to row {start_row}")]
    EmptyInput { start_row: usize },

    /// A header line exists but no data row follows it.
    #[error("No data rows found below the header (start row {start_row})")]
    NoDataRows { start_row: usize },

    /// The CSV reader rejected a record.
    #[error("Malformed record {record}: {message}")]
    Malformed { record: usize, message: String },
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors while extracting a worksheet from a spreadsheet container.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// The bytes are not a workbook calamine can open.
    #[error("Failed to read workbook: {0}")]
    Unreadable(String),

    /// The container holds no worksheet at all.
    #[error("No worksheets found in workbook")]
    NoWorksheets,

    /// Requested worksheet does not exist.
    #[error("Worksheet index {index} is out of range: workbook has {count} sheet(s)")]
    IndexOutOfRange { index: usize, count: usize },

    /// The worksheet exists but its cells could not be read.
    #[error("Failed to read worksheet '{name}': {message}")]
    Sheet { name: String, message: String },

    /// Rendering the cell grid as CSV failed.
    #[error("Failed to render worksheet as CSV: {0}")]
    Render(String),
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::load_table`]
/// and the [`crate::transform::pipeline::ConversionSession`] methods.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Delimited text error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Spreadsheet error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Reading the source file or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing CSV output failed.
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Profile Errors
// =============================================================================

/// Errors from the profile store.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile with that name.
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// The built-in profile cannot be removed.
    #[error("Profile '{0}' is built in and cannot be deleted")]
    Protected(String),

    /// IO error.
    #[error("Profile store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Profile store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion error.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for workbook extraction.
pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// Result type for pipeline operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let parse_err = ParseError::EmptyInput { start_row: 4 };
        let convert_err: ConvertError = parse_err.into();
        assert!(convert_err.to_string().contains("row 4"));

        let workbook_err = WorkbookError::NoWorksheets;
        let convert_err: ConvertError = workbook_err.into();
        assert!(convert_err.to_string().contains("No worksheets"));

        let server_err: ServerError = convert_err.into();
        assert!(server_err.to_string().starts_with("Conversion error"));
    }

    #[test]
    fn test_out_of_range_message_names_index_and_count() {
        let err = WorkbookError::IndexOutOfRange { index: 5, count: 3 };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_malformed_record_format() {
        let err = ParseError::Malformed {
            record: 7,
            message: "unexpected quote".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("record 7"));
        assert!(msg.contains("unexpected quote"));
    }
}
