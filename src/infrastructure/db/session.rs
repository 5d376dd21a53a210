use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::query::QueryAs;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use std::time::Instant;
use tracing::debug;

use crate::application::use_cases::sql_compiler::{CompiledQuery, SqlValue};
use crate::domain::error::{AppError, Result};
use crate::domain::estimate::{Estimate, GeneralConstruction};

use super::EstimateStore;

/// One pooled connection held for the lifetime of a request.
///
/// The connection goes back to the pool when the session is dropped, so every
/// exit path of a handler releases it.
pub struct DbSession {
    conn: PoolConnection<Sqlite>,
    opened_at: Instant,
}

impl DbSession {
    pub async fn open(pool: &SqlitePool) -> Result<Self> {
        let conn = pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open session: {}", e)))?;

        Ok(Self {
            conn,
            opened_at: Instant::now(),
        })
    }
}

impl Drop for DbSession {
    fn drop(&mut self) {
        debug!(
            held_ms = self.opened_at.elapsed().as_millis() as u64,
            "Database session released"
        );
    }
}

fn bind_params<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Integer(value) => query.bind(*value),
        };
    }
    query
}

#[async_trait]
impl EstimateStore for DbSession {
    async fn fetch_estimates(&mut self, query: &CompiledQuery) -> Result<Vec<Estimate>> {
        let statement = sqlx::query_as::<_, EstimateEntity>(&query.sql);
        let rows = bind_params(statement, &query.params)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch estimates: {}", e)))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_text_column(&mut self, query: &CompiledQuery) -> Result<Vec<String>> {
        let statement = sqlx::query_as::<_, (String,)>(&query.sql);
        let rows = bind_params(statement, &query.params)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch values: {}", e)))?;

        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    async fn fetch_integer_column(&mut self, query: &CompiledQuery) -> Result<Vec<i64>> {
        let statement = sqlx::query_as::<_, (i64,)>(&query.sql);
        let rows = bind_params(statement, &query.params)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch values: {}", e)))?;

        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    async fn fetch_group_maxima(&mut self, query: &CompiledQuery) -> Result<Vec<(String, i64)>> {
        let statement = sqlx::query_as::<_, (String, i64)>(&query.sql);
        bind_params(statement, &query.params)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch maxima: {}", e)))
    }

    async fn fetch_decisions(&mut self) -> Result<Vec<GeneralConstruction>> {
        sqlx::query_as::<_, GeneralConstructionEntity>(
            r#"SELECT "id", "topic", "decision", "rationale" FROM "GenCons" ORDER BY "id" ASC"#,
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch decisions: {}", e)))
        .map(|entities| entities.into_iter().map(Into::into).collect())
    }
}

// Internal entities for database mapping
#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
struct EstimateEntity {
    id: i64,
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

impl From<EstimateEntity> for Estimate {
    fn from(e: EstimateEntity) -> Self {
        Self {
            id: e.id,
            indicator_category: e.indicator_category,
            indicator_name: e.indicator_name,
            geography: e.geography,
            year: e.year,
            survey: e.survey,
            value: e.value,
            standard_error: e.standard_error,
            sample_size: e.sample_size,
            source: e.source,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GeneralConstructionEntity {
    id: i64,
    topic: String,
    decision: String,
    rationale: Option<String>,
}

impl From<GeneralConstructionEntity> for GeneralConstruction {
    fn from(e: GeneralConstructionEntity) -> Self {
        Self {
            id: e.id,
            topic: e.topic,
            decision: e.decision,
            rationale: e.rationale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connection::memory_pool;
    use crate::infrastructure::db::schema::apply_schema;

    #[tokio::test]
    async fn test_session_returns_connection_on_drop() {
        let pool = memory_pool().await;
        apply_schema(&pool).await.unwrap();

        {
            let _session = DbSession::open(&pool).await.unwrap();
            assert_eq!(pool.num_idle(), 0);
        }

        // Single-connection pool: a second session only opens if the first was released.
        let second = DbSession::open(&pool).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_decisions_in_id_order() {
        let pool = memory_pool().await;
        apply_schema(&pool).await.unwrap();
        sqlx::query(
            r#"INSERT INTO "GenCons" ("id", "topic", "decision", "rationale") VALUES
               (2, 'Weights', 'Use survey weights', NULL),
               (1, 'Outliers', 'Trim at 3 SD', 'Standard practice in DHS reports')"#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let mut session = DbSession::open(&pool).await.unwrap();
        let decisions = session.fetch_decisions().await.unwrap();

        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].topic, "Outliers");
        assert_eq!(decisions[1].rationale, None);
    }

    #[tokio::test]
    async fn test_bound_params_reach_the_query() {
        let pool = memory_pool().await;
        apply_schema(&pool).await.unwrap();
        sqlx::query(
            r#"INSERT INTO "Estimates"
               ("indicatorCategory", "indicatorName", "geography", "year", "value")
               VALUES ('Health', 'Stunting', 'Kenya', 2014, 26.0),
                      ('Health', 'Stunting', 'Kenya', 2008, 35.2)"#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let query = CompiledQuery {
            sql: r#"SELECT "year" FROM "Estimates" WHERE "geography" = ? AND "year" = ?"#
                .to_string(),
            params: vec![SqlValue::text("Kenya"), SqlValue::Integer(2008)],
            description: String::new(),
        };

        let mut session = DbSession::open(&pool).await.unwrap();
        assert_eq!(
            session.fetch_integer_column(&query).await.unwrap(),
            vec![2008]
        );
    }
}
