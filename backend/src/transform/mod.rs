//! Transformation module.
//!
//! This module turns parsed tables into YNAB output:
//! - Mapper: source rows to target rows (amount split, sign inversion)
//! - Serializer: target rows to quoted CSV text
//! - Pipeline: loading, session state and one-shot conversion

pub mod mapper;
pub mod pipeline;
pub mod serializer;

pub use mapper::transform;
pub use pipeline::*;
pub use serializer::{output_file_name, output_file_name_now, serialize, serialize_table};
