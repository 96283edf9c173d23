//! Workbook to delimited text.
//!
//! Extracts one worksheet from an Excel container (xlsx, xlsm, xlsb, xls)
//! and renders it the way a CSV export of that sheet would look, so the
//! result can go through the regular [`crate::parser`].
//!
//! The source bytes are only borrowed. Switching worksheets is just another
//! call with a different index on the same bytes.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::Timelike;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Cursor;

use crate::error::WorkbookError;

/// Extensions handled as spreadsheets.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb"];

/// A worksheet rendered as comma-delimited text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSheet {
    /// CSV text of the selected worksheet.
    pub text: String,
    /// Every worksheet in stored order.
    pub worksheet_names: Vec<String>,
    /// Name of the selected worksheet.
    pub worksheet_name: String,
}

/// Lower-cased extension of `filename`, empty if none.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn is_spreadsheet(filename: &str) -> bool {
    SPREADSHEET_EXTENSIONS.contains(&file_extension(filename).as_str())
}

/// Display label: the upper-cased extension for spreadsheets, `CSV` otherwise.
pub fn file_type(filename: &str) -> String {
    if is_spreadsheet(filename) {
        file_extension(filename).to_uppercase()
    } else {
        "CSV".to_string()
    }
}

fn open(bytes: &[u8]) -> Result<Sheets<Cursor<&[u8]>>, WorkbookError> {
    open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| WorkbookError::Unreadable(e.to_string()))
}

/// Worksheet names in stored order.
pub fn worksheet_names(bytes: &[u8]) -> Result<Vec<String>, WorkbookError> {
    let workbook = open(bytes)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Render the worksheet at `worksheet_index` as CSV text.
pub fn extract_sheet(bytes: &[u8], worksheet_index: usize) -> Result<ExtractedSheet, WorkbookError> {
    let mut workbook = open(bytes)?;
    let worksheet_names = workbook.sheet_names().to_vec();

    if worksheet_names.is_empty() {
        return Err(WorkbookError::NoWorksheets);
    }
    let worksheet_name = worksheet_names
        .get(worksheet_index)
        .cloned()
        .ok_or(WorkbookError::IndexOutOfRange {
            index: worksheet_index,
            count: worksheet_names.len(),
        })?;

    let range = workbook
        .worksheet_range(&worksheet_name)
        .map_err(|e| WorkbookError::Sheet {
            name: worksheet_name.clone(),
            message: e.to_string(),
        })?;

    let text = range_to_csv(&range)?;

    Ok(ExtractedSheet {
        text,
        worksheet_names,
        worksheet_name,
    })
}

/// Write the used range of the sheet, quoting only where needed.
///
/// Output starts at the first used cell: blank rows above and blank
/// columns left of the data produce nothing.
fn range_to_csv(range: &Range<Data>) -> Result<String, WorkbookError> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in range.rows() {
        let record: Vec<String> = row.iter().map(cell_to_string).collect();
        writer
            .write_record(&record)
            .map_err(|e| WorkbookError::Render(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| WorkbookError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| WorkbookError::Render(e.to_string()))
}

/// Raw text of a cell.
///
/// Number formats are not applied: integral floats lose their `.0` and
/// dates come out as ISO `YYYY-MM-DD`, whatever the cell's display format.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.num_seconds_from_midnight() == 0 => {
                value.format("%Y-%m-%d").to_string()
            }
            Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn three_sheet_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("January").unwrap();
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_string(0, 1, "Description").unwrap();
        sheet.write_string(0, 2, "Amount").unwrap();
        sheet.write_string(1, 0, "2024-01-01").unwrap();
        sheet.write_string(1, 1, "Smith, John").unwrap();
        sheet.write_number(1, 2, -50.0).unwrap();
        sheet.write_string(2, 0, "2024-01-02").unwrap();
        sheet.write_string(2, 1, "Salary").unwrap();
        sheet.write_number(2, 2, 2000.25).unwrap();

        let sheet = workbook.add_worksheet();
        sheet.set_name("February").unwrap();
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_string(0, 1, "Memo").unwrap();
        sheet.write_string(1, 0, "2024-02-01").unwrap();
        sheet.write_string(1, 1, "Said \"hi\"").unwrap();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Offset").unwrap();
        sheet.write_string(2, 1, "Header").unwrap();
        sheet.write_boolean(3, 1, true).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_file_classification() {
        assert!(is_spreadsheet("Statement.XLSX"));
        assert!(is_spreadsheet("old.xls"));
        assert!(!is_spreadsheet("export.csv"));
        assert!(!is_spreadsheet("no_extension"));
        assert_eq!(file_type("book.xlsm"), "XLSM");
        assert_eq!(file_type("export.txt"), "CSV");
        assert_eq!(file_extension("a.b.CSV"), "csv");
    }

    #[test]
    fn test_lists_worksheets_in_order() {
        let bytes = three_sheet_workbook();
        let names = worksheet_names(&bytes).unwrap();
        assert_eq!(names, vec!["January", "February", "Offset"]);
    }

    #[test]
    fn test_extracts_first_sheet_as_csv() {
        let bytes = three_sheet_workbook();
        let sheet = extract_sheet(&bytes, 0).unwrap();

        assert_eq!(sheet.worksheet_name, "January");
        assert_eq!(sheet.worksheet_names.len(), 3);
        let lines: Vec<&str> = sheet.text.lines().collect();
        assert_eq!(lines[0], "Date,Description,Amount");
        assert_eq!(lines[1], "2024-01-01,\"Smith, John\",-50");
        assert_eq!(lines[2], "2024-01-02,Salary,2000.25");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let bytes = three_sheet_workbook();
        let sheet = extract_sheet(&bytes, 1).unwrap();
        assert!(sheet.text.contains("\"Said \"\"hi\"\"\""));
    }

    #[test]
    fn test_output_starts_at_used_range() {
        let bytes = three_sheet_workbook();
        let sheet = extract_sheet(&bytes, 2).unwrap();

        assert_eq!(sheet.text, "Header\nTRUE\n");
    }

    #[test]
    fn test_out_of_range_index() {
        let bytes = three_sheet_workbook();
        let err = extract_sheet(&bytes, 5).unwrap_err();

        assert!(matches!(err, WorkbookError::IndexOutOfRange { index: 5, count: 3 }));
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_switching_sheets_leaves_bytes_untouched() {
        let bytes = three_sheet_workbook();
        let copy = bytes.clone();

        let first = extract_sheet(&bytes, 0).unwrap();
        let second = extract_sheet(&bytes, 1).unwrap();
        let again = extract_sheet(&bytes, 0).unwrap();

        assert_ne!(first.text, second.text);
        assert_eq!(first, again);
        assert_eq!(bytes, copy);
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let err = extract_sheet(b"Date,Amount\n2024-01-01,5", 0).unwrap_err();
        assert!(matches!(err, WorkbookError::Unreadable(_)));
    }

    #[test]
    fn test_worksheet_names_of_garbage_is_unreadable() {
        let err = worksheet_names(b"garbage").unwrap_err();
        assert!(matches!(err, WorkbookError::Unreadable(_)));
        assert!(err.to_string().starts_with("Failed to read workbook"));
    }

    #[test]
    fn test_date_cells_render_as_iso_not_display_format() {
        use rust_xlsxwriter::{ExcelDateTime, Format};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date = ExcelDateTime::from_ymd(2024, 1, 15).unwrap();
        let format = Format::new().set_num_format("dd/mm/yyyy");
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_datetime_with_format(1, 0, &date, &format).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheet = extract_sheet(&bytes, 0).unwrap();
        assert_eq!(sheet.text, "Date\n2024-01-15\n");
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell_to_string(&Data::Float(12.0)), "12");
        assert_eq!(cell_to_string(&Data::Float(-0.5)), "-0.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::Bool(false)), "FALSE");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::DateTimeIso("2024-03-01".into())), "2024-03-01");
    }
}
