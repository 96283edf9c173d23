//! REST API types for the conversion endpoints.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::encoding::{AUTO_ENCODING, ENCODINGS};
use crate::models::{ColumnMapping, ConversionOptions, Delimiter, NormalizedRow, TargetSchema};
use crate::transform::pipeline::LoadedTable;

/// Conversion settings sent alongside an upload.
///
/// Each field arrives as its own multipart text part holding JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionRequest {
    pub options: ConversionOptions,
    pub schema: TargetSchema,
    /// Identity mapping for the schema when absent.
    pub mapping: Option<ColumnMapping>,
}

impl ConversionRequest {
    pub fn effective_mapping(&self) -> ColumnMapping {
        self.mapping
            .clone()
            .unwrap_or_else(|| ColumnMapping::identity(self.schema))
    }
}

/// Response for `POST /api/preview`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Always "ok"
    pub status: String,
    pub file_name: String,
    pub headers: Vec<String>,
    pub worksheet_names: Vec<String>,
    /// Delimiter the table was parsed with.
    pub delimiter: String,
    pub encoding: String,
    pub row_count: usize,
    pub schema: TargetSchema,
    /// Target column order for `preview`.
    pub columns: Vec<String>,
    pub preview: Vec<NormalizedRow>,
}

impl PreviewResponse {
    pub fn new(file_name: &str, loaded: LoadedTable, schema: TargetSchema, preview: Vec<NormalizedRow>) -> Self {
        Self {
            status: "ok".to_string(),
            file_name: file_name.to_string(),
            row_count: loaded.table.row_count(),
            delimiter: loaded.table.delimiter.to_string(),
            headers: loaded.table.headers,
            worksheet_names: loaded.worksheet_names,
            encoding: loaded.encoding,
            schema,
            columns: schema.columns().iter().map(|c| c.to_string()).collect(),
            preview,
        }
    }
}

/// Response for `GET /api/catalog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub encodings: Vec<String>,
    pub delimiters: Vec<String>,
    pub schemas: Vec<SchemaInfo>,
}

/// One target schema and its columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub columns: Vec<String>,
}

impl CatalogResponse {
    pub fn current() -> Self {
        Self {
            encodings: std::iter::once(AUTO_ENCODING)
                .chain(ENCODINGS.iter().copied())
                .map(String::from)
                .collect(),
            delimiters: Delimiter::ALL.iter().map(|d| d.to_string()).collect(),
            schemas: TargetSchema::all()
                .iter()
                .map(|s| SchemaInfo {
                    name: s.name().to_string(),
                    columns: s.columns().iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
