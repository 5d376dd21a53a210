use crate::domain::error::Result;
use crate::domain::estimate::{Estimate, EstimateColumn};
use crate::infrastructure::csv::CsvWriter;

pub const CSV_FILENAME: &str = "indicator_estimates.csv";
pub const CSV_MIME: &str = "text/csv";

/// Serializes a result set as a CSV document.
pub struct CsvExport {
    writer: CsvWriter,
}

impl CsvExport {
    pub fn new(crlf: bool) -> Self {
        let writer = if crlf {
            CsvWriter::new().with_crlf()
        } else {
            CsvWriter::new()
        };
        Self { writer }
    }

    /// Header row of column names, then one record per estimate in the same
    /// column order. An empty result set still produces the header.
    pub fn make_csv(&self, columns: &[EstimateColumn], rows: &[Estimate]) -> Result<String> {
        self.writer.write_document(
            columns.iter().map(|column| column.name()),
            rows.iter().map(|row| row.text_values(columns)),
        )
    }

    /// The export uses every column except the primary key.
    pub fn export_estimates(&self, rows: &[Estimate]) -> Result<String> {
        self.make_csv(EstimateColumn::exported(), rows)
    }
}

impl Default for CsvExport {
    fn default() -> Self {
        Self::new(false)
    }
}
