use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::domain::app_config::AppConfig;
use crate::domain::error::{AppError, Result};

use super::schema::apply_schema;

/// Opens the connection pool and makes sure both reference tables exist.
pub async fn init_pool(config: &AppConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
        })?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

    apply_schema(&pool).await?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;

    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Database pool ready"
    );

    Ok(pool)
}

/// Single-connection in-memory pool. Every connection to `sqlite::memory:`
/// is a separate database, so the pool must never open a second one.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

/// In-memory pool with both tables created and a small fixture loaded.
#[cfg(test)]
pub(crate) async fn seeded_memory_pool() -> SqlitePool {
    let pool = memory_pool().await;
    apply_schema(&pool).await.unwrap();

    sqlx::query(
        r#"INSERT INTO "Estimates"
           ("id", "indicatorCategory", "indicatorName", "geography", "year", "survey",
            "value", "standardError", "sampleSize", "source")
           VALUES
           (1, 'Health', 'Stunting', 'Kenya', 2008, 'DHS', 35.2, 1.1, 6079, NULL),
           (2, 'Health', 'Stunting', 'Kenya', 2014, 'DHS', 26.0, 0.8, 20964, NULL),
           (3, 'Health', 'Wasting', 'Kenya', 2014, 'DHS', 4.0, NULL, 20964, NULL),
           (4, 'Health', 'Stunting', 'Uganda', 2011, 'DHS', 33.4, 1.3, 2356, NULL),
           (5, 'Health', 'Wasting', 'Uganda', 2016, 'DHS', 3.6, NULL, 4765, NULL),
           (6, 'Education', 'Literacy', 'Kenya', 2014, 'DHS, round 7', 78.1, NULL, NULL,
            'Ministry "EMIS" tables'),
           (7, 'Education', 'Literacy', 'Uganda', 2016, 'UNHS', 70.2, NULL, NULL, NULL)"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"INSERT INTO "GenCons" ("id", "topic", "decision", "rationale") VALUES
           (1, 'Weights', 'All estimates use survey sampling weights', NULL),
           (2, 'Age groups', 'Children under five, per WHO growth standards',
            'Matches DHS tabulations')"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_pool_creates_tables() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        };
        let pool = init_pool(&config).await.unwrap();

        let count: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "GenCons""#)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_init_pool_fails_for_missing_directory() {
        let config = AppConfig {
            database_url: "sqlite:///nonexistent-dir/nested/estimates.db".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            init_pool(&config).await,
            Err(AppError::DatabaseError(_))
        ));
    }
}
