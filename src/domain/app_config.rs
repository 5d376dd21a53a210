use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(length(min = 1))]
    pub database_url: String,
    #[validate(range(min = 1, max = 64))]
    pub max_connections: u32,
    #[validate(range(min = 1, max = 300))]
    pub acquire_timeout_secs: u64,
    pub log_filter: String,
    pub allowed_origins: Vec<String>,
    /// Terminate exported CSV records with `\r\n` instead of `\n`.
    pub csv_crlf: bool,
    /// Seed file for an empty `Estimates` table.
    pub estimates_csv: Option<PathBuf>,
    /// Seed file for an empty `GenCons` table.
    pub decisions_csv: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_url: "sqlite://estimates.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            log_filter: "info".to_string(),
            allowed_origins: Vec::new(),
            csv_crlf: false,
            estimates_csv: None,
            decisions_csv: None,
        }
    }
}
