// ============================================================
// CSV PARSER
// ============================================================
// Parse header-keyed CSV seed files

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::error::AppError;

/// One data line keyed by header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// 1-based line number of the record, header excluded
    pub line: usize,
    values: HashMap<String, String>,
}

impl CsvRecord {
    /// Value of a column, `None` when the column is absent or the cell is empty
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// CSV parser for seed data
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a CSV file and return its records
    pub fn parse_file(&self, path: &Path) -> Result<Vec<CsvRecord>, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::IoError(format!("Failed to open {}: {}", path.display(), e))
        })?;

        self.parse_reader(file)
    }

    /// Parse CSV content from any reader
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Vec<CsvRecord>, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true) // Short rows leave trailing columns empty
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        let mut records = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            records.push(self.parse_record(index + 1, &headers, &record));
        }

        Ok(records)
    }

    fn parse_record(
        &self,
        line: usize,
        headers: &StringRecord,
        record: &StringRecord,
    ) -> CsvRecord {
        let values = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                (
                    header.to_string(),
                    record.get(idx).unwrap_or("").to_string(),
                )
            })
            .collect();

        CsvRecord { line, values }
    }
}
