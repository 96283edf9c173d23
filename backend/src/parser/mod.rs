//! Delimited text to [`ParsedTable`], with delimiter auto-detection.
//!
//! Works on already-decoded text; byte decoding lives in [`crate::encoding`].
//! No YNAB-specific logic here.

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;

use crate::error::ParseError;
use crate::models::{ConversionOptions, Delimiter, ParsedTable, Row};

/// Header name given to blank header cells.
pub const UNNAMED_COLUMN: &str = "Unnamed column";

/// Candidates tried by auto-detection, in preference order.
const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '|', '\t'];

/// Records sampled when guessing the delimiter.
const DETECTION_SAMPLE: usize = 10;

/// Parse `text` according to `options`.
///
/// # Example
/// ```ignore
/// use ynab_converter::{parse, ConversionOptions};
///
/// let table = parse("Date;Amount\n2024-01-01;-5", &ConversionOptions::default()).unwrap();
/// assert_eq!(table.headers, vec!["Date", "Amount"]);
/// assert_eq!(table.delimiter, ';');
/// ```
pub fn parse(text: &str, options: &ConversionOptions) -> Result<ParsedTable, ParseError> {
    options.validate()?;
    parse_text(
        text,
        options.delimiter.as_char(),
        options.start_row,
        options.duplicate_first_row,
    )
}

/// Parse with an explicit delimiter (`None` = detect).
pub fn parse_text(
    text: &str,
    delimiter: Option<char>,
    start_row: usize,
    duplicate_first_row: bool,
) -> Result<ParsedTable, ParseError> {
    if start_row < 1 {
        return Err(ParseError::InvalidStartRow(start_row));
    }

    let body = select_lines(text, start_row, duplicate_first_row)
        .ok_or(ParseError::EmptyInput { start_row })?;

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&body));
    let mut records = read_records(&body, delimiter)?.into_iter();

    let header_record = records.next().ok_or(ParseError::EmptyInput { start_row })?;
    let headers = normalize_headers(header_record.iter());

    let rows: Vec<Row> = records
        .map(|record| {
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return Err(ParseError::NoDataRows { start_row });
    }

    Ok(ParsedTable {
        headers,
        rows,
        delimiter,
    })
}

/// Drop the lines before `start_row` and optionally repeat the first one.
///
/// Works on raw `\n`-separated lines, before any quote handling.
/// Returns `None` when nothing but blank lines remains.
fn select_lines(text: &str, start_row: usize, duplicate_first_row: bool) -> Option<String> {
    let mut lines: Vec<&str> = text.split('\n').skip(start_row - 1).collect();

    if lines.iter().all(|l| l.trim().is_empty()) {
        return None;
    }

    if duplicate_first_row {
        let first = lines[0];
        lines.insert(0, first);
    }

    Some(lines.join("\n"))
}

/// Read every non-blank record.
fn read_records(body: &str, delimiter: char) -> Result<Vec<StringRecord>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(body.as_bytes());

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ParseError::Malformed {
            record: idx + 1,
            message: e.to_string(),
        })?;

        if is_blank(&record) {
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

fn is_blank(record: &StringRecord) -> bool {
    record.is_empty() || (record.len() == 1 && record[0].is_empty())
}

/// Make header names usable as keys.
///
/// Blank names become [`UNNAMED_COLUMN`]; repeats get ` (1)`, ` (2)`, ...
/// until the name differs from every name assigned so far.
pub fn normalize_headers<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut assigned: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for header in raw {
        let base = if header.trim().is_empty() {
            UNNAMED_COLUMN
        } else {
            header
        };

        let mut name = base.to_string();
        let mut counter = 0;
        while assigned.contains(&name) {
            counter += 1;
            name = format!("{} ({})", base, counter);
        }

        assigned.insert(name.clone());
        headers.push(name);
    }

    headers
}

/// Guess the delimiter from the first records of `content`.
///
/// Each candidate is scored on how steady the field count stays from record
/// to record; candidates that never split a line are ignored. Ties go to
/// more fields per record, then to candidate order. Defaults to comma.
pub fn detect_delimiter(content: &str) -> char {
    let mut best: Option<(char, usize, f64)> = None;

    for &candidate in &DELIMITER_CANDIDATES {
        let counts = sample_field_counts(content, candidate);
        if counts.is_empty() {
            continue;
        }

        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        if avg < 2.0 {
            continue;
        }

        let delta: usize = counts.windows(2).map(|w| w[0].abs_diff(w[1])).sum();

        let better = match best {
            None => true,
            Some((_, best_delta, best_avg)) => {
                delta < best_delta || (delta == best_delta && avg > best_avg)
            }
        };
        if better {
            best = Some((candidate, delta, avg));
        }
    }

    best.map(|(c, _, _)| c).unwrap_or(',')
}

fn sample_field_counts(content: &str, delimiter: char) -> Vec<usize> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    reader
        .records()
        .filter_map(Result::ok)
        .filter(|r| !is_blank(r))
        .take(DETECTION_SAMPLE)
        .map(|r| r.len())
        .collect()
}

/// Convenience wrapper with default options and an explicit delimiter.
pub fn parse_with_delimiter(text: &str, delimiter: Delimiter) -> Result<ParsedTable, ParseError> {
    parse(
        text,
        &ConversionOptions {
            delimiter,
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_with_delimiter("name;age\nAlice;30\nBob;25", Delimiter::Semicolon).unwrap();

        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["name"], "Alice");
        assert_eq!(table.rows[0]["age"], "30");
        assert_eq!(table.rows[1]["name"], "Bob");
        assert_eq!(table.rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values_keep_delimiters() {
        let csv = "Payee,Amount\n\"Smith, John\",\"1,000.00\"\n\"Say \"\"hi\"\"\",5";
        let table = parse_with_delimiter(csv, Delimiter::Comma).unwrap();

        assert_eq!(table.rows[0]["Payee"], "Smith, John");
        assert_eq!(table.rows[0]["Amount"], "1,000.00");
        assert_eq!(table.rows[1]["Payee"], "Say \"hi\"");
    }

    #[test]
    fn test_cells_are_not_trimmed() {
        let table = parse_with_delimiter("a,b\n  1 , 2", Delimiter::Comma).unwrap();
        assert_eq!(table.rows[0]["a"], "  1 ");
        assert_eq!(table.rows[0]["b"], " 2");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_with_delimiter("a;b\n1;2\n\n3;4\n", Delimiter::Semicolon).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["a"], "3");
    }

    #[test]
    fn test_crlf_line_endings() {
        let table = parse_with_delimiter("a,b\r\n1,2\r\n3,4\r\n", Delimiter::Comma).unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["b"], "4");
    }

    #[test]
    fn test_short_rows_leave_cells_absent() {
        let table = parse_with_delimiter("a;b;c\n1;;3\n4", Delimiter::Semicolon).unwrap();

        assert_eq!(table.rows[0]["b"], "");
        assert_eq!(table.rows[0]["c"], "3");
        assert_eq!(table.rows[1]["a"], "4");
        assert!(!table.rows[1].contains_key("b"));
        assert!(!table.rows[1].contains_key("c"));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let table = parse_with_delimiter("a;b\n1;2;3;4", Delimiter::Semicolon).unwrap();
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.rows[0]["b"], "2");
    }

    #[test]
    fn test_duplicate_headers_are_numbered() {
        let table = parse_with_delimiter("A,A,A\n1,2,3", Delimiter::Comma).unwrap();
        assert_eq!(table.headers, vec!["A", "A (1)", "A (2)"]);
        assert_eq!(table.rows[0]["A (2)"], "3");
    }

    #[test]
    fn test_duplicate_suffix_skips_taken_names() {
        let headers = normalize_headers(["A", "A (1)", "A"]);
        assert_eq!(headers, vec!["A", "A (1)", "A (2)"]);
    }

    #[test]
    fn test_blank_headers_become_unnamed() {
        let headers = normalize_headers(["", "Amount", "  ", ""]);
        assert_eq!(
            headers,
            vec!["Unnamed column", "Amount", "Unnamed column (1)", "Unnamed column (2)"]
        );
    }

    #[test]
    fn test_start_row_skips_banner_lines() {
        let text = "Bank export\nAccount 1234\nDate,Payee,Amount\n2024-01-01,Shop,-5\n2024-01-02,Cafe,-3";
        let opts = ConversionOptions {
            start_row: 3,
            ..Default::default()
        };
        let table = parse(text, &opts).unwrap();

        assert_eq!(table.headers, vec!["Date", "Payee", "Amount"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["Payee"], "Shop");
    }

    #[test]
    fn test_start_row_past_end_fails() {
        let opts = ConversionOptions {
            start_row: 10,
            ..Default::default()
        };
        let err = parse("a,b\n1,2", &opts).unwrap_err();
        assert!(matches!(err, ParseError::EmptyInput { start_row: 10 }));
    }

    #[test]
    fn test_zero_start_row_rejected() {
        let opts = ConversionOptions {
            start_row: 0,
            ..Default::default()
        };
        assert!(matches!(parse("a\n1", &opts), Err(ParseError::InvalidStartRow(0))));
    }

    #[test]
    fn test_duplicate_first_row_counts_header_as_data() {
        let opts = ConversionOptions {
            duplicate_first_row: true,
            ..Default::default()
        };
        let table = parse("2024-01-01,Shop,-5\n2024-01-02,Cafe,-3", &opts).unwrap();

        assert_eq!(table.headers, vec!["2024-01-01", "Shop", "-5"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["Shop"], "Shop");
        assert_eq!(table.rows[1]["Shop"], "Cafe");
    }

    #[test]
    fn test_duplicate_first_row_applies_after_start_row() {
        let opts = ConversionOptions {
            start_row: 2,
            duplicate_first_row: true,
            ..Default::default()
        };
        let table = parse("banner\nx,y\n1,2", &opts).unwrap();
        assert_eq!(table.headers, vec!["x", "y"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["x"], "x");
    }

    #[test]
    fn test_header_only_fails() {
        let err = parse("Date,Amount\n", &ConversionOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::NoDataRows { start_row: 1 }));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = parse("", &ConversionOptions::default()).unwrap_err();
        assert!(err.to_string().contains("No content"));
    }

    #[test]
    fn test_unsupported_encoding_rejected_before_parsing() {
        let opts = ConversionOptions {
            encoding: "EBCDIC".into(),
            ..Default::default()
        };
        assert!(matches!(parse("a\n1", &opts), Err(ParseError::UnsupportedEncoding(_))));
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_detect_prefers_consistent_counts() {
        // Decimal commas inside a semicolon file
        let content = "Date;Amount\n01.01.2024;-50,00\n02.01.2024;1200,50";
        assert_eq!(detect_delimiter(content), ';');
    }

    #[test]
    fn test_detect_defaults_to_comma() {
        assert_eq!(detect_delimiter("single\ncolumn"), ',');
    }

    #[test]
    fn test_auto_delimiter_reported() {
        let table = parse("name|age\nAlice|30", &ConversionOptions::default()).unwrap();
        assert_eq!(table.delimiter, '|');
        assert_eq!(table.rows[0]["age"], "30");
    }
}
