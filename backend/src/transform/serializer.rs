//! YNAB CSV output.
//!
//! Every cell is double-quoted, embedded quotes are doubled and the value is
//! trimmed. Lines end with `\n`, including the last one.

use chrono::{Local, NaiveDate};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io;

use crate::error::ConvertResult;
use crate::models::{NormalizedRow, ParsedTable, TargetSchema};

/// Render converted rows under the schema header.
pub fn serialize(schema: TargetSchema, rows: &[NormalizedRow]) -> ConvertResult<String> {
    let header: Vec<&str> = schema.columns().iter().map(|c| c.as_str()).collect();

    render(
        &header,
        rows.iter()
            .map(|row| schema.columns().iter().map(|c| row.get(*c)).collect()),
    )
}

/// Render a parsed table with its own headers, unmapped.
pub fn serialize_table(table: &ParsedTable) -> ConvertResult<String> {
    let header: Vec<&str> = table.headers.iter().map(String::as_str).collect();

    render(
        &header,
        table.rows.iter().map(|row| {
            table
                .headers
                .iter()
                .map(|h| row.get(h).map(String::as_str))
                .collect()
        }),
    )
}

fn render<'a>(
    header: &[&str],
    rows: impl Iterator<Item = Vec<Option<&'a str>>>,
) -> ConvertResult<String> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header.iter().map(|h| h.trim()))?;
    for row in rows {
        writer.write_record(row.iter().map(|cell| cell.unwrap_or("").trim()))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// `ynab_data_YYYYMMDD.csv` for the given day.
pub fn output_file_name(date: NaiveDate) -> String {
    format!("ynab_data_{}.csv", date.format("%Y%m%d"))
}

/// Output file name for today in the local calendar.
pub fn output_file_name_now() -> String {
    output_file_name(Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnMapping, ConversionOptions, Delimiter, TargetColumn};
    use crate::parser::{parse, parse_with_delimiter};
    use crate::transform::mapper::transform;

    #[test]
    fn test_header_only_for_no_rows() {
        assert_eq!(
            serialize(TargetSchema::Legacy, &[]).unwrap(),
            "\"Date\",\"Payee\",\"Memo\",\"Outflow\",\"Inflow\"\n"
        );
        assert_eq!(
            serialize(TargetSchema::Unified, &[]).unwrap(),
            "\"Date\",\"Payee\",\"Memo\",\"Amount\"\n"
        );
    }

    #[test]
    fn test_missing_cells_are_empty_quotes() {
        let rows = vec![NormalizedRow::from([
            (TargetColumn::Date, "2024-01-01"),
            (TargetColumn::Outflow, "50.00"),
        ])];

        let csv = serialize(TargetSchema::Legacy, &rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "\"2024-01-01\",\"\",\"\",\"50.00\",\"\"");
        assert!(csv.ends_with("\"\"\n"));
    }

    #[test]
    fn test_quotes_escaped_and_whitespace_trimmed() {
        let rows = vec![NormalizedRow::from([
            (TargetColumn::Payee, "  Joe's \"Diner\"  "),
            (TargetColumn::Memo, "a, b"),
        ])];

        let csv = serialize(TargetSchema::Unified, &rows).unwrap();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "\"\",\"Joe's \"\"Diner\"\"\",\"a, b\",\"\""
        );
    }

    #[test]
    fn test_one_line_per_row_with_trailing_newline() {
        let table = parse_with_delimiter(
            "Date,Description,Amount\n2024-01-01,Grocery,-50.00\n2024-01-02,Salary,2000.00",
            Delimiter::Comma,
        )
        .unwrap();
        let mapping = ColumnMapping::new()
            .with(TargetColumn::Date, "Date")
            .with(TargetColumn::Payee, "Description")
            .with(TargetColumn::Outflow, "Amount")
            .with(TargetColumn::Inflow, "Amount");
        let rows = transform(&table, TargetSchema::Legacy, &mapping, false, None);

        let csv = serialize(TargetSchema::Legacy, &rows).unwrap();
        assert_eq!(
            csv,
            "\"Date\",\"Payee\",\"Memo\",\"Outflow\",\"Inflow\"\n\
             \"2024-01-01\",\"Grocery\",\"\",\"50.00\",\"\"\n\
             \"2024-01-02\",\"Salary\",\"\",\"\",\"2000.00\"\n"
        );
    }

    #[test]
    fn test_table_round_trip() {
        let source = "Date;Payee;Memo\n2024-01-01;\"Smith; John\";\"He said \"\"ok\"\"\"\n2024-01-02;Cafe;";
        let opts = ConversionOptions::default();
        let table = parse(source, &opts).unwrap();

        let csv = serialize_table(&table).unwrap();
        let reparsed = parse(&csv, &opts).unwrap();

        assert_eq!(reparsed.headers, table.headers);
        assert_eq!(reparsed.rows, table.rows);
    }

    #[test]
    fn test_output_file_name_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(output_file_name(date), "ynab_data_20240307.csv");
    }

    #[test]
    fn test_output_file_name_now_shape() {
        let name = output_file_name_now();
        assert!(name.starts_with("ynab_data_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "ynab_data_YYYYMMDD.csv".len());
    }
}
