//! Column mapping: parsed source rows to YNAB rows.
//!
//! Every target column reads one source header. Outflow and Inflow get
//! special treatment because banks export amounts either as one signed
//! column or as two unsigned ones:
//!
//! ```text
//! split (Outflow and Inflow read the same header)
//!   "-50.00"  ->  Outflow "50.00"            (inverted: Inflow "50.00")
//!   "2000.00" ->  Inflow  "2000.00"          (inverted: Outflow "2000.00")
//!
//! separate (different headers)
//!   each side has a leading '-' stripped, inversion ignored
//! ```
//!
//! Pure and deterministic: a limited call is always a prefix of the
//! unlimited one.

use crate::models::{ColumnMapping, NormalizedRow, ParsedTable, Row, TargetColumn, TargetSchema};

/// How Outflow/Inflow values are derived for a given mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowMode {
    /// Schema has no Outflow/Inflow pair.
    None,
    /// One signed column feeds both sides.
    Split { invert: bool },
    /// Two columns, already magnitudes.
    Separate,
}

impl FlowMode {
    fn resolve(schema: TargetSchema, mapping: &ColumnMapping, invert_sign: bool) -> Self {
        if !schema.has_flow_columns() {
            FlowMode::None
        } else if mapping.is_split() {
            FlowMode::Split { invert: invert_sign }
        } else {
            FlowMode::Separate
        }
    }
}

/// Convert `table` rows into `schema` rows.
///
/// `limit` keeps only the first rows (used for previews). Empty and missing
/// cells leave their target column out of the row.
pub fn transform(
    table: &ParsedTable,
    schema: TargetSchema,
    mapping: &ColumnMapping,
    invert_sign: bool,
    limit: Option<usize>,
) -> Vec<NormalizedRow> {
    let mode = FlowMode::resolve(schema, mapping, invert_sign);

    table
        .rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| map_row(row, schema, mapping, mode))
        .collect()
}

fn map_row(row: &Row, schema: TargetSchema, mapping: &ColumnMapping, mode: FlowMode) -> NormalizedRow {
    let mut output = NormalizedRow::new();

    for &column in schema.columns() {
        let cell = match mapping.get(column).and_then(|source| row.get(source)) {
            Some(cell) if !cell.is_empty() => cell.as_str(),
            _ => continue,
        };

        let value = match (column, mode) {
            (TargetColumn::Outflow | TargetColumn::Inflow, FlowMode::Split { invert }) => {
                split_amount(cell, column, invert)
            }
            (TargetColumn::Outflow | TargetColumn::Inflow, FlowMode::Separate) => {
                Some(strip_sign(cell))
            }
            _ => Some(cell),
        };

        if let Some(value) = value {
            output.insert(column, value);
        }
    }

    output
}

/// Value for one side of a signed amount, `None` if it belongs to the other.
fn split_amount(cell: &str, column: TargetColumn, invert: bool) -> Option<&str> {
    let negative = cell.starts_with('-');
    let is_outflow = negative != invert;

    let wanted = match column {
        TargetColumn::Outflow => is_outflow,
        TargetColumn::Inflow => !is_outflow,
        _ => return Some(cell),
    };

    wanted.then(|| strip_sign(cell))
}

/// Drop one leading minus sign.
fn strip_sign(value: &str) -> &str {
    value.strip_prefix('-').unwrap_or(value)
}
