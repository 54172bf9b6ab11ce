//! CSV and spreadsheet extractors.

use std::path::Path;

use serde_json::Value;

use super::{ContentExtractor, source_metadata};
use crate::document::Segment;
use crate::error::{DocIndexError, Result};

/// Extractor for `.csv` files: one segment per data row.
///
/// Each row is rendered as `header: value` lines, and its zero-based
/// position is stored as `row` in the metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExtractor;

impl CsvExtractor {
    /// Create a CSV extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for CsvExtractor {
    fn name(&self) -> &str {
        "csv"
    }

    fn extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;
        let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();

        let mut segments = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| csv_error(path, e))?;
            let text = record
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let header = headers.get(i).unwrap_or("");
                    format!("{}: {}", header.trim(), value.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");

            let mut metadata = source_metadata(path);
            metadata.insert("row".to_string(), Value::from(row));
            segments.push(Segment::new(text, metadata));
        }
        Ok(segments)
    }
}

fn csv_error(path: &Path, error: csv::Error) -> DocIndexError {
    if error.is_io_error() {
        if let csv::ErrorKind::Io(io) = error.into_kind() {
            return DocIndexError::io(path, io);
        }
        return DocIndexError::extraction("csv", "I/O failure");
    }
    DocIndexError::extraction("csv", error)
}

/// Extractor for `.xls` and `.xlsx` workbooks: one segment per worksheet.
///
/// Rows become tab-separated lines; fully empty rows are skipped. The sheet
/// name is stored as `sheet` in the metadata.
#[cfg(feature = "office")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcelExtractor;

#[cfg(feature = "office")]
impl ExcelExtractor {
    /// Create a spreadsheet extractor.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "office")]
impl ContentExtractor for ExcelExtractor {
    fn name(&self) -> &str {
        "excel"
    }

    fn extensions(&self) -> &[&str] {
        &["xls", "xlsx"]
    }

    fn extract(&self, path: &Path) -> Result<Vec<Segment>> {
        use calamine::{Data, Reader, open_workbook_auto};

        let mut workbook =
            open_workbook_auto(path).map_err(|e| DocIndexError::extraction("excel", e))?;
        let names: Vec<String> = workbook.sheet_names().to_vec();

        let mut segments = Vec::new();
        for name in names {
            let range =
                workbook.worksheet_range(&name).map_err(|e| DocIndexError::extraction("excel", e))?;

            let lines: Vec<String> = range
                .rows()
                .map(|row| {
                    row.iter()
                        .map(|cell| match cell {
                            Data::Empty => String::new(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .filter(|line| !line.trim().is_empty())
                .collect();
            if lines.is_empty() {
                continue;
            }

            let mut metadata = source_metadata(path);
            metadata.insert("sheet".to_string(), Value::from(name));
            segments.push(Segment::new(lines.join("\n"), metadata));
        }
        Ok(segments)
    }
}
