//! Loading, re-parsing and exporting a single source file.
//!
//! [`load_table`] turns raw bytes into a [`ParsedTable`], picking the
//! spreadsheet or delimited-text path from the file name.
//! [`ConversionSession`] keeps the original bytes around so that every option
//! change re-parses from scratch, and [`convert_bytes`] is the one-shot path
//! used by the CLI and the HTTP server.
//!
//! # Example
//!
//! ```rust,ignore
//! use ynab_converter::{ConversionOptions, ConversionSession, ColumnMapping, TargetSchema};
//!
//! let bytes = std::fs::read("export.csv")?;
//! let mut session = ConversionSession::open(
//!     "export.csv",
//!     bytes,
//!     ConversionOptions::default(),
//!     TargetSchema::Legacy,
//!     ColumnMapping::identity(TargetSchema::Legacy),
//! )?;
//!
//! session.toggle_invert_sign()?;
//! std::fs::write(session.export_file_name(), session.export_csv()?)?;
//! ```

use serde::Serialize;
use std::fs;
use std::path::Path;

use super::mapper::transform;
use super::serializer::{output_file_name_now, serialize};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::PREVIEW_ROWS;
use crate::encoding::{decode_content, DEFAULT_ENCODING};
use crate::error::ConvertResult;
use crate::models::{ColumnMapping, ConversionOptions, NormalizedRow, ParsedTable, TargetSchema};
use crate::parser::{parse, parse_text};
use crate::spreadsheet::{extract_sheet, file_type, is_spreadsheet};

/// A parsed source file and what was learned while reading it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedTable {
    pub table: ParsedTable,
    /// Worksheet names, empty for delimited text.
    pub worksheet_names: Vec<String>,
    /// Encoding used to decode the bytes.
    pub encoding: String,
}

/// Read a source file from disk, returning its name and bytes.
pub fn read_source(path: &Path) -> ConvertResult<(String, Vec<u8>)> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok((file_name, bytes))
}

/// Read `bytes` as the file called `file_name`.
///
/// Spreadsheets are rendered to CSV and always parsed with a comma: the
/// `delimiter` option is ignored for them, and so is `encoding`.
pub fn load_table(
    file_name: &str,
    bytes: &[u8],
    options: &ConversionOptions,
) -> ConvertResult<LoadedTable> {
    options.validate()?;
    log_info(format!(
        "Reading {} ({} file, {} bytes)",
        file_name,
        file_type(file_name),
        bytes.len()
    ));

    if is_spreadsheet(file_name) {
        let sheet = extract_sheet(bytes, options.worksheet_index)?;
        log_info(format!(
            "Worksheet {}/{}: {}",
            options.worksheet_index + 1,
            sheet.worksheet_names.len(),
            sheet.worksheet_name
        ));

        let table = parse_text(
            &sheet.text,
            Some(','),
            options.start_row,
            options.duplicate_first_row,
        )?;
        log_success(format!(
            "Read {} rows, {} columns",
            table.row_count(),
            table.headers.len()
        ));

        return Ok(LoadedTable {
            table,
            worksheet_names: sheet.worksheet_names,
            encoding: DEFAULT_ENCODING.to_string(),
        });
    }

    let (text, encoding) = decode_content(bytes, &options.encoding)?;
    let table = parse(&text, options)?;
    log_success(format!(
        "Read {} rows, {} columns (encoding {}, delimiter '{}')",
        table.row_count(),
        table.headers.len(),
        encoding,
        display_delimiter(table.delimiter)
    ));

    Ok(LoadedTable {
        table,
        worksheet_names: Vec::new(),
        encoding: encoding.to_string(),
    })
}

fn display_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        other => other.to_string(),
    }
}

/// Interactive conversion state for one source file.
///
/// Holds the original bytes, the active options, schema and mapping, and the
/// table parsed from them. A failed re-parse leaves everything unchanged.
#[derive(Debug, Clone)]
pub struct ConversionSession {
    file_name: String,
    bytes: Vec<u8>,
    options: ConversionOptions,
    schema: TargetSchema,
    mapping: ColumnMapping,
    loaded: LoadedTable,
}

impl ConversionSession {
    pub fn open(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        options: ConversionOptions,
        schema: TargetSchema,
        mapping: ColumnMapping,
    ) -> ConvertResult<Self> {
        let file_name = file_name.into();
        let loaded = load_table(&file_name, &bytes, &options)?;

        Ok(Self {
            file_name,
            bytes,
            options,
            schema,
            mapping,
            loaded,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn schema(&self) -> TargetSchema {
        self.schema
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn table(&self) -> &ParsedTable {
        &self.loaded.table
    }

    pub fn headers(&self) -> &[String] {
        &self.loaded.table.headers
    }

    pub fn worksheet_names(&self) -> &[String] {
        &self.loaded.worksheet_names
    }

    pub fn encoding(&self) -> &str {
        &self.loaded.encoding
    }

    pub fn is_spreadsheet(&self) -> bool {
        is_spreadsheet(&self.file_name)
    }

    /// Re-parse the original bytes with `options`.
    pub fn set_options(&mut self, options: ConversionOptions) -> ConvertResult<()> {
        match load_table(&self.file_name, &self.bytes, &options) {
            Ok(loaded) => {
                self.loaded = loaded;
                self.options = options;
                Ok(())
            }
            Err(e) => {
                log_warning(format!("Keeping previous settings: {}", e));
                Err(e)
            }
        }
    }

    pub fn select_worksheet(&mut self, index: usize) -> ConvertResult<()> {
        self.set_options(ConversionOptions {
            worksheet_index: index,
            ..self.options.clone()
        })
    }

    pub fn set_invert_sign(&mut self, invert_sign: bool) -> ConvertResult<()> {
        self.set_options(ConversionOptions {
            invert_sign,
            ..self.options.clone()
        })
    }

    pub fn toggle_invert_sign(&mut self) -> ConvertResult<()> {
        self.set_invert_sign(!self.options.invert_sign)
    }

    pub fn set_schema(&mut self, schema: TargetSchema) {
        self.schema = schema;
    }

    /// Switch to the other schema and return it.
    pub fn toggle_schema(&mut self) -> TargetSchema {
        self.schema = self.schema.toggled();
        self.schema
    }

    pub fn set_mapping(&mut self, mapping: ColumnMapping) {
        self.mapping = mapping;
    }

    /// First [`PREVIEW_ROWS`] converted rows.
    pub fn preview(&self) -> Vec<NormalizedRow> {
        self.convert(Some(PREVIEW_ROWS))
    }

    pub fn converted_rows(&self) -> Vec<NormalizedRow> {
        self.convert(None)
    }

    /// The full YNAB CSV for the current state.
    pub fn export_csv(&self) -> ConvertResult<String> {
        serialize(self.schema, &self.converted_rows())
    }

    pub fn export_file_name(&self) -> String {
        output_file_name_now()
    }

    fn convert(&self, limit: Option<usize>) -> Vec<NormalizedRow> {
        transform(
            &self.loaded.table,
            self.schema,
            &self.mapping,
            self.options.invert_sign,
            limit,
        )
    }
}

/// Output of a one-shot conversion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub csv: String,
    pub file_name: String,
    pub row_count: usize,
    pub headers: Vec<String>,
    pub worksheet_names: Vec<String>,
    pub encoding: String,
    pub delimiter: char,
}

/// Load, map and serialize in one go.
pub fn convert_bytes(
    file_name: &str,
    bytes: &[u8],
    options: &ConversionOptions,
    schema: TargetSchema,
    mapping: &ColumnMapping,
) -> ConvertResult<ConversionResult> {
    let loaded = load_table(file_name, bytes, options)?;

    log_info(format!("Mapping to the {} schema", schema.name()));
    for (column, source) in mapping.iter().filter(|(c, _)| schema.contains(*c)) {
        if !loaded.table.has_header(source) {
            log_warning(format!("{} maps to missing column '{}'", column, source));
        }
    }

    let rows = transform(&loaded.table, schema, mapping, options.invert_sign, None);
    let csv = serialize(schema, &rows)?;
    log_success(format!("Converted {} rows", rows.len()));

    Ok(ConversionResult {
        csv,
        file_name: output_file_name_now(),
        row_count: rows.len(),
        headers: loaded.table.headers,
        worksheet_names: loaded.worksheet_names,
        encoding: loaded.encoding,
        delimiter: loaded.table.delimiter,
    })
}
