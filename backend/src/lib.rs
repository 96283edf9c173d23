//! # YNAB Converter - bank exports to YNAB import CSV
//!
//! Reads CSV and Excel exports from any bank, lets the user map its columns
//! onto the YNAB import format, and writes the CSV YNAB expects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│   Mapper    │────▶│  YNAB CSV   │
//! │ (any enc.)  │     │ (auto-delim)│     │ (split/inv) │     │  (quoted)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ynab_converter::{convert_bytes, ColumnMapping, ConversionOptions, TargetSchema};
//!
//! let bytes = std::fs::read("export.csv")?;
//! let result = convert_bytes(
//!     "export.csv",
//!     &bytes,
//!     &ConversionOptions::default(),
//!     TargetSchema::Legacy,
//!     &ColumnMapping::identity(TargetSchema::Legacy),
//! )?;
//! std::fs::write(&result.file_name, result.csv)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Tables, schemas, mappings and options
//! - [`encoding`] - Encoding catalog, detection and decoding
//! - [`parser`] - Delimited text parsing with delimiter detection
//! - [`spreadsheet`] - Worksheet extraction from Excel files
//! - [`transform`] - Mapping, serialization and the conversion session
//! - [`profiles`] - Saved per-bank settings
//! - [`config`] - Constants and environment settings
//! - [`api`] - HTTP API server and log stream

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Reading
pub mod encoding;
pub mod parser;
pub mod spreadsheet;

// Transformation
pub mod transform;

// Profiles
pub mod profiles;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConvertError, ConvertResult, ParseError, ParseResult, ProfileError, ProfileResult,
    ServerError, WorkbookError, WorkbookResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    ColumnMapping, ConversionOptions, Delimiter, NormalizedRow, ParsedTable, Row, TargetColumn,
    TargetSchema,
};

// =============================================================================
// Re-exports - Reading
// =============================================================================

pub use encoding::{decode_content, detect_encoding, ENCODINGS};
pub use parser::{detect_delimiter, parse, parse_text};
pub use spreadsheet::{extract_sheet, is_spreadsheet, worksheet_names, ExtractedSheet};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    convert_bytes, load_table, output_file_name, output_file_name_now, read_source, serialize,
    serialize_table, transform, ConversionResult, ConversionSession, LoadedTable,
};

// =============================================================================
// Re-exports - Profiles
// =============================================================================

pub use profiles::{Profile, ProfileStore, DEFAULT_PROFILE_NAME};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
