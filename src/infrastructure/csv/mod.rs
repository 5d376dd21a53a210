// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Reading seed files and writing export documents

mod csv_parser;
mod csv_writer;

pub use csv_parser::{CsvParser, CsvRecord};
pub use csv_writer::CsvWriter;
