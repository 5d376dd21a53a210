// ============================================================
// CSV WRITER
// ============================================================
// RFC 4180 quoting over the csv crate, buffered into a String

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::domain::error::AppError;

/// Builds a complete CSV document in memory
pub struct CsvWriter {
    delimiter: u8,
    terminator: Terminator,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::Any(b'\n'),
        }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `\r\n` between records
    pub fn with_crlf(mut self) -> Self {
        self.terminator = Terminator::CRLF;
        self
    }

    /// Write the header followed by every record. Fields are quoted only when
    /// they contain the delimiter, a quote, or a line break.
    pub fn write_document<H, R, F>(&self, header: H, records: R) -> Result<String, AppError>
    where
        H: IntoIterator,
        H::Item: AsRef<[u8]>,
        R: IntoIterator<Item = F>,
        F: IntoIterator,
        F::Item: AsRef<[u8]>,
    {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer
            .write_record(header)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;

        for record in records {
            writer
                .write_record(record)
                .map_err(|e| AppError::Internal(format!("Failed to write CSV record: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV output: {}", e)))?;

        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("CSV output is not valid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_unquoted() {
        let doc = CsvWriter::new()
            .write_document(["a", "b"], vec![vec!["1", "2"], vec!["3", "4"]])
            .unwrap();
        assert_eq!(doc, "a,b\n1,2\n3,4\n");
    }

    #[test]
    fn test_special_fields_quoted() {
        let doc = CsvWriter::new()
            .write_document(
                ["note"],
                vec![vec!["x, y"], vec!["say \"hi\""], vec!["two\nlines"]],
            )
            .unwrap();
        assert_eq!(doc, "note\n\"x, y\"\n\"say \"\"hi\"\"\"\n\"two\nlines\"\n");
    }

    #[test]
    fn test_crlf_terminator() {
        let doc = CsvWriter::new()
            .with_crlf()
            .write_document(["a"], vec![vec!["1"]])
            .unwrap();
        assert_eq!(doc, "a\r\n1\r\n");
    }

    #[test]
    fn test_header_only_document() {
        let doc = CsvWriter::new()
            .write_document(["a", "b"], Vec::<Vec<String>>::new())
            .unwrap();
        assert_eq!(doc, "a,b\n");
    }
}
