pub mod csv_export;
pub mod filter_builder;
pub mod filter_options;
pub mod sql_compiler;
