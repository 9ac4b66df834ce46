//! Raw file loading.
//!
//! Measurement files are read whole into memory. Text files are decoded
//! as UTF-8 with an ISO-8859-1 fallback; workbooks are read through
//! calamine and flattened into rows of cell strings. The handle is
//! dropped before any analysis starts.

use crate::error::{ProcessorError, Result};
use crate::models::{MeasurementFile, SourceKind};
use calamine::{Data, Reader, open_workbook_auto};
use std::fs;
use tracing::debug;

/// In-memory content of one measurement file
#[derive(Debug, Clone, PartialEq)]
pub enum RawContent {
    /// Text lines without line terminators
    Text(Vec<String>),
    /// First worksheet, one vector of cell strings per row
    Sheet(Vec<Vec<String>>),
}

impl RawContent {
    /// Number of columns spanned by a worksheet, `None` for text
    pub fn sheet_width(&self) -> Option<usize> {
        match self {
            RawContent::Text(_) => None,
            RawContent::Sheet(rows) => Some(rows.iter().map(Vec::len).max().unwrap_or(0)),
        }
    }

    /// Rows as comma-separated tokens, the view used for header detection
    pub fn header_tokens(&self) -> Vec<Vec<String>> {
        match self {
            RawContent::Text(lines) => lines
                .iter()
                .map(|line| line.trim().split(',').map(str::to_string).collect())
                .collect(),
            RawContent::Sheet(rows) => rows.clone(),
        }
    }
}

/// Read a measurement file into memory
pub fn load(file: &MeasurementFile) -> Result<RawContent> {
    match file.kind() {
        SourceKind::Csv | SourceKind::Text => {
            let bytes = fs::read(file.path()).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ProcessorError::FileNotFound {
                    path: file.path().to_path_buf(),
                },
                _ => ProcessorError::Io(e),
            })?;
            let text = decode_text(bytes);
            let lines: Vec<String> = text.lines().map(str::to_string).collect();
            debug!("Loaded {} lines from {}", lines.len(), file.path().display());
            Ok(RawContent::Text(lines))
        }
        SourceKind::Spreadsheet => load_sheet(file),
    }
}

fn load_sheet(file: &MeasurementFile) -> Result<RawContent> {
    let spreadsheet_error = |reason: String| ProcessorError::Spreadsheet {
        path: file.path().to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(file.path()).map_err(|e| spreadsheet_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| spreadsheet_error("workbook contains no worksheets".to_string()))?
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    debug!("Loaded {} worksheet rows from {}", rows.len(), file.path().display());
    Ok(RawContent::Sheet(rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// Decode UTF-8, falling back to ISO-8859-1 which maps every byte
fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!("Content is not valid UTF-8, decoding as ISO-8859-1");
            err.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Split a text line into cells for the given reader
pub fn split_cells(line: &str, kind: SourceKind) -> Vec<&str> {
    match kind {
        SourceKind::Csv => line.split(',').collect(),
        SourceKind::Text | SourceKind::Spreadsheet => line.split_whitespace().collect(),
    }
}

/// Parse a cell as a decimal number, accepting `,` as decimal separator
pub fn parse_float(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok()
}

/// Numeric coercion used when materializing tables: quotes are stripped
/// and anything unparseable becomes missing
pub fn coerce(cell: &str) -> Option<f64> {
    parse_float(cell.trim().trim_matches('"')).filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_float_decimal_comma() {
        assert_eq!(parse_float("1,5"), Some(1.5));
        assert_eq!(parse_float(" 2.25\n"), Some(2.25));
        assert_eq!(parse_float("-3e2"), Some(-300.0));
        assert_eq!(parse_float("R1"), None);
        assert_eq!(parse_float(""), None);
    }

    #[test]
    fn test_coerce_strips_quotes_and_nan() {
        assert_eq!(coerce("\"4.5\""), Some(4.5));
        assert_eq!(coerce("nan"), None);
        assert_eq!(coerce("n/a"), None);
    }

    #[test]
    fn test_split_cells_by_kind() {
        assert_eq!(split_cells("1,2,3", SourceKind::Csv), vec!["1", "2", "3"]);
        assert_eq!(split_cells("1\t2   3", SourceKind::Text), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_latin1_fallback() {
        let mut temp_file = NamedTempFile::with_suffix(".txt").unwrap();
        temp_file.write_all(b"Temperatur \xb0C\n1 2\n").unwrap();
        temp_file.flush().unwrap();

        let file = MeasurementFile::new(temp_file.path()).unwrap();
        let content = load(&file).unwrap();
        match content {
            RawContent::Text(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[0], "Temperatur \u{b0}C");
            }
            RawContent::Sheet(_) => panic!("expected text content"),
        }
    }

    #[test]
    fn test_header_tokens_split_by_comma() {
        let content = RawContent::Text(vec!["x,y, R1 \r".to_string()]);
        assert_eq!(content.header_tokens(), vec![vec!["x", "y", " R1"]]);
        assert_eq!(content.sheet_width(), None);
    }
}
