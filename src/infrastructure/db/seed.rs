//! One-time import of reference data into empty tables.
//!
//! The tables are reference data loaded from outside the web process. When a
//! seed file is configured and the target table has no rows, its records are
//! inserted in a single transaction. Tables that already hold rows are never
//! touched.

use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::estimate::{EstimateColumn, ESTIMATES_TABLE, GEN_CONS_TABLE};
use crate::infrastructure::csv::{CsvParser, CsvRecord};

#[derive(Debug, Clone, PartialEq)]
struct EstimateSeed {
    id: Option<i64>,
    indicator_category: String,
    indicator_name: String,
    geography: String,
    year: i64,
    survey: Option<String>,
    value: f64,
    standard_error: Option<f64>,
    sample_size: Option<i64>,
    source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct DecisionSeed {
    id: Option<i64>,
    topic: String,
    decision: String,
    rationale: Option<String>,
}

pub async fn seed_estimates_from_file(pool: &SqlitePool, path: &Path) -> Result<u64> {
    let records = CsvParser::new().parse_file(path)?;
    seed_estimates(pool, &records).await
}

pub async fn seed_decisions_from_file(pool: &SqlitePool, path: &Path) -> Result<u64> {
    let records = CsvParser::new().parse_file(path)?;
    seed_decisions(pool, &records).await
}

/// Returns the number of inserted rows; zero when the table was not empty.
pub async fn seed_estimates(pool: &SqlitePool, records: &[CsvRecord]) -> Result<u64> {
    if table_has_rows(pool, ESTIMATES_TABLE).await? {
        info!("Estimates table already populated, skipping seed");
        return Ok(0);
    }

    let rows: Vec<EstimateSeed> = records.iter().filter_map(parse_estimate).collect();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to begin seed: {}", e)))?;

    for row in &rows {
        sqlx::query(
            r#"INSERT INTO "Estimates"
               ("id", "indicatorCategory", "indicatorName", "geography", "year",
                "survey", "value", "standardError", "sampleSize", "source")
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(row.id)
        .bind(&row.indicator_category)
        .bind(&row.indicator_name)
        .bind(&row.geography)
        .bind(row.year)
        .bind(&row.survey)
        .bind(row.value)
        .bind(row.standard_error)
        .bind(row.sample_size)
        .bind(&row.source)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert estimate: {}", e)))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit seed: {}", e)))?;

    info!(
        inserted = rows.len(),
        skipped = records.len() - rows.len(),
        "Seeded Estimates table"
    );

    Ok(rows.len() as u64)
}

/// Returns the number of inserted rows; zero when the table was not empty.
pub async fn seed_decisions(pool: &SqlitePool, records: &[CsvRecord]) -> Result<u64> {
    if table_has_rows(pool, GEN_CONS_TABLE).await? {
        info!("GenCons table already populated, skipping seed");
        return Ok(0);
    }

    let rows: Vec<DecisionSeed> = records.iter().filter_map(parse_decision).collect();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to begin seed: {}", e)))?;

    for row in &rows {
        sqlx::query(
            r#"INSERT INTO "GenCons" ("id", "topic", "decision", "rationale") VALUES (?, ?, ?, ?)"#,
        )
        .bind(row.id)
        .bind(&row.topic)
        .bind(&row.decision)
        .bind(&row.rationale)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert decision: {}", e)))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit seed: {}", e)))?;

    info!(
        inserted = rows.len(),
        skipped = records.len() - rows.len(),
        "Seeded GenCons table"
    );

    Ok(rows.len() as u64)
}

async fn table_has_rows(pool: &SqlitePool, table: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(&format!("SELECT 1 FROM \"{}\" LIMIT 1", table))
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to inspect {}: {}", table, e)))?;

    Ok(row.is_some())
}

fn parse_estimate(record: &CsvRecord) -> Option<EstimateSeed> {
    let parsed = build_estimate(record);
    if parsed.is_none() {
        warn!(line = record.line, "Skipping malformed estimate row");
    }
    parsed
}

fn build_estimate(record: &CsvRecord) -> Option<EstimateSeed> {
    let text = |column: EstimateColumn| record.get(column.name()).map(str::to_string);

    Some(EstimateSeed {
        id: optional_number(record, EstimateColumn::Id)?,
        indicator_category: text(EstimateColumn::IndicatorCategory)?,
        indicator_name: text(EstimateColumn::IndicatorName)?,
        geography: text(EstimateColumn::Geography)?,
        year: record.get(EstimateColumn::Year.name())?.parse().ok()?,
        survey: text(EstimateColumn::Survey),
        value: record.get(EstimateColumn::Value.name())?.parse().ok()?,
        standard_error: optional_number(record, EstimateColumn::StandardError)?,
        sample_size: optional_number(record, EstimateColumn::SampleSize)?,
        source: text(EstimateColumn::Source),
    })
}

fn parse_decision(record: &CsvRecord) -> Option<DecisionSeed> {
    let id = match record.get("id").map(str::parse::<i64>) {
        None => Some(None),
        Some(Ok(id)) => Some(Some(id)),
        Some(Err(_)) => None,
    };

    let parsed = id.and_then(|id| {
        Some(DecisionSeed {
            id,
            topic: record.get("topic")?.to_string(),
            decision: record.get("decision")?.to_string(),
            rationale: record.get("rationale").map(str::to_string),
        })
    });

    if parsed.is_none() {
        warn!(line = record.line, "Skipping malformed decision row");
    }
    parsed
}

/// `Some(None)` for an empty cell, `None` for a cell that does not parse.
fn optional_number<T: std::str::FromStr>(
    record: &CsvRecord,
    column: EstimateColumn,
) -> Option<Option<T>> {
    match record.get(column.name()) {
        None => Some(None),
        Some(raw) => raw.parse().ok().map(Some),
    }
}
