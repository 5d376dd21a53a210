pub mod app_config;
pub mod error;
pub mod estimate;
pub mod filter;
