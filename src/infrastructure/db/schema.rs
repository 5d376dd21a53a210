use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::domain::estimate::{EstimateColumn, ESTIMATES_TABLE};

pub const ESTIMATES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "Estimates" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "indicatorCategory" TEXT NOT NULL,
    "indicatorName" TEXT NOT NULL,
    "geography" TEXT NOT NULL,
    "year" INTEGER NOT NULL,
    "survey" TEXT,
    "value" REAL NOT NULL,
    "standardError" REAL,
    "sampleSize" INTEGER,
    "source" TEXT
)"#;

pub const GEN_CONS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "GenCons" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "topic" TEXT NOT NULL,
    "decision" TEXT NOT NULL,
    "rationale" TEXT
)"#;

const ESTIMATES_INDEXES: [&str; 2] = [
    r#"CREATE INDEX IF NOT EXISTS idx_estimates_category
       ON "Estimates" ("indicatorCategory", "indicatorName")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_estimates_geography_year
       ON "Estimates" ("geography", "year")"#,
];

/// Creates missing tables. Existing tables are left untouched.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in [ESTIMATES_SCHEMA, GEN_CONS_SCHEMA]
        .into_iter()
        .chain(ESTIMATES_INDEXES)
    {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to apply schema: {}", e)))?;
    }

    Ok(())
}

/// Column names of `Estimates` as the database reports them, in schema order.
pub async fn estimate_table_columns(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", ESTIMATES_TABLE))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read table info: {}", e)))?;

    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|e| AppError::DatabaseError(format!("Invalid table info row: {}", e)))
        })
        .collect()
}

/// Checks that the live table matches the column set the exporter relies on.
pub async fn verify_estimates_schema(pool: &SqlitePool) -> Result<()> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))?;

    let actual = estimate_table_columns(&mut conn).await?;
    let expected: Vec<&str> = EstimateColumn::ALL.iter().map(|c| c.name()).collect();

    if actual != expected {
        warn!(?actual, ?expected, "Estimates table columns differ from the expected schema");
        return Err(AppError::ValidationError(format!(
            "Estimates table has columns {:?}, expected {:?}",
            actual, expected
        )));
    }

    Ok(())
}
