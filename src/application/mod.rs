pub mod use_cases;

pub use use_cases::csv_export::CsvExport;
pub use use_cases::filter_builder::FilterBuilder;
pub use use_cases::filter_options::{FilterOptions, IndexView};
