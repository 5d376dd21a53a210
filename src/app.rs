use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::domain::app_config::AppConfig;
use crate::domain::error::Result;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::db::init_pool;
use crate::infrastructure::db::schema::verify_estimates_schema;
use crate::infrastructure::db::seed::{seed_decisions_from_file, seed_estimates_from_file};
use crate::interfaces::http::{start_server, HttpState};

pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = ConfigService::new().load()?;
    init_tracing(&config.log_filter);

    let pool = init_pool(&config).await?;
    seed_reference_data(&pool, &config).await?;
    verify_estimates_schema(&pool).await?;

    info!(host = %config.host, port = config.port, "Starting HTTP server");
    let state = HttpState::new(pool, &config);
    start_server(state, &config)?.await?;

    info!("HTTP server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter when it is set.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn seed_reference_data(pool: &SqlitePool, config: &AppConfig) -> Result<()> {
    if let Some(path) = &config.estimates_csv {
        let inserted = seed_estimates_from_file(pool, path).await?;
        info!(path = %path.display(), inserted, "Seeded estimates");
    }
    if let Some(path) = &config.decisions_csv {
        let inserted = seed_decisions_from_file(pool, path).await?;
        info!(path = %path.display(), inserted, "Seeded decisions");
    }
    Ok(())
}
