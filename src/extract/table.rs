use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};

use super::{detect_kind, DocumentKind, LineExtractor};
use crate::error::ExtractError;
use crate::parser::lines::classify_rows;
use crate::parser::record::DATE_FORMAT;

/// Workbook formats calamine understands; only the first sheet is read.
pub struct SpreadsheetExtractor;

/// Comma-separated text; no header row, rows may differ in length.
pub struct DelimitedExtractor;

impl LineExtractor for SpreadsheetExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let range = first_sheet(path)?;
        Ok(range_lines(&range))
    }
}

impl LineExtractor for DelimitedExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let file = std::fs::File::open(path)?;
        delimited_lines(file)
    }
}

fn first_sheet(path: &Path) -> Result<Range<Data>, ExtractError> {
    if detect_kind(path) == DocumentKind::Spreadsheet {
        let workbook =
            open_workbook_auto(path).map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
        first_range(workbook)
    } else {
        // no usable extension (e.g. "Planilha_base"): sniff the content
        let bytes = std::fs::read(path)?;
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;
        first_range(workbook)
    }
}

fn first_range<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<Range<Data>, ExtractError> {
    match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => Ok(range),
        Some(Err(e)) => Err(ExtractError::Spreadsheet(e.to_string())),
        None => Err(ExtractError::Spreadsheet("workbook has no sheets".into())),
    }
}

pub fn range_lines(range: &Range<Data>) -> Vec<String> {
    classify_rows(range.rows().map(|row| row.iter().map(cell_text)))
}

pub fn delimited_lines<R: Read>(input: R) -> Result<Vec<String>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        // exports from older spreadsheet tools are often not UTF-8
        let cells: Vec<Option<String>> = record
            .iter()
            .map(|c| Some(String::from_utf8_lossy(c).into_owned()))
            .collect();
        rows.push(cells);
    }
    Ok(classify_rows(rows))
}

/// Render a cell as the text a user sees, without numeric coercion.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(n) => Some(n.to_string()),
        // Display drops the fraction of integral floats: 123.0 -> "123"
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| dt.to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}
