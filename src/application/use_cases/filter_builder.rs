//! Filter Builder
//!
//! Translates submitted form state into a conjunctive predicate over the
//! `Estimates` table and runs it through an [`EstimateStore`].
//!
//! "Most recent survey" is resolved in two steps: an aggregation query finds
//! the latest year per geography under the other constraints, then the row
//! query keeps only `(geography, year)` pairs from that lookup.

use std::collections::BTreeMap;
use tracing::debug;

use crate::application::use_cases::sql_compiler::{
    OrderBy, Predicate, Projection, QueryPlan, SqlCompiler, SqlValue,
};
use crate::domain::error::Result;
use crate::domain::estimate::{Estimate, EstimateColumn};
use crate::domain::filter::{FilterRequest, FormFields, YearSelection};
use crate::infrastructure::db::EstimateStore;

/// Year condition after any lookups have been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearConstraint {
    Unconstrained,
    Exact(i64),
    PerGeography(BTreeMap<String, i64>),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FilterBuilder {
    compiler: SqlCompiler,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self {
            compiler: SqlCompiler::new(),
        }
    }

    /// Parse the form and return the matching rows, ordered by `id`.
    ///
    /// An empty form yields no rows without touching the store.
    pub async fn handle_form<S>(&self, store: &mut S, form: &FormFields) -> Result<Vec<Estimate>>
    where
        S: EstimateStore + ?Sized,
    {
        let request = FilterRequest::from_form(form);
        self.execute(store, &request).await
    }

    pub async fn execute<S>(&self, store: &mut S, request: &FilterRequest) -> Result<Vec<Estimate>>
    where
        S: EstimateStore + ?Sized,
    {
        if !request.submitted {
            return Ok(Vec::new());
        }

        let year = self.resolve_year(store, request).await?;

        let Some(plan) = rows_plan(request, &year) else {
            debug!("Most recent lookup matched no geographies");
            return Ok(Vec::new());
        };

        let query = self.compiler.compile(&plan)?;
        debug!(description = %query.description, "Running estimate filter");

        store.fetch_estimates(&query).await
    }

    async fn resolve_year<S>(
        &self,
        store: &mut S,
        request: &FilterRequest,
    ) -> Result<YearConstraint>
    where
        S: EstimateStore + ?Sized,
    {
        match request.year {
            YearSelection::AllYears => Ok(YearConstraint::Unconstrained),
            YearSelection::Exact(year) => Ok(YearConstraint::Exact(year)),
            YearSelection::MostRecent => {
                let query = self.compiler.compile(&latest_years_plan(request))?;
                let latest = store.fetch_group_maxima(&query).await?;
                Ok(YearConstraint::PerGeography(latest.into_iter().collect()))
            }
        }
    }
}

/// Membership predicates for every non-empty selection
pub fn selection_predicates(request: &FilterRequest) -> Vec<Predicate> {
    [
        (EstimateColumn::IndicatorCategory, &request.categories),
        (EstimateColumn::Geography, &request.geographies),
        (EstimateColumn::IndicatorName, &request.indicators),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .map(|(column, values)| Predicate::In {
        column,
        values: values.iter().cloned().map(SqlValue::Text).collect(),
    })
    .collect()
}

/// Latest year per geography among rows matching the selections
pub fn latest_years_plan(request: &FilterRequest) -> QueryPlan {
    let plan = QueryPlan::new(Projection::MaxPerGroup {
        group: EstimateColumn::Geography,
        max: EstimateColumn::Year,
    })
    .order_by(OrderBy::asc(EstimateColumn::Geography));

    selection_predicates(request)
        .into_iter()
        .fold(plan, QueryPlan::filter)
}

/// Row query for a resolved year constraint. `None` means nothing can match.
pub fn rows_plan(request: &FilterRequest, year: &YearConstraint) -> Option<QueryPlan> {
    let mut plan = QueryPlan::new(Projection::Rows(EstimateColumn::ALL.to_vec()))
        .order_by(OrderBy::asc(EstimateColumn::Id));

    for predicate in selection_predicates(request) {
        plan = plan.filter(predicate);
    }

    match year {
        YearConstraint::Unconstrained => {}
        YearConstraint::Exact(year) => {
            plan = plan.filter(Predicate::Eq {
                column: EstimateColumn::Year,
                value: SqlValue::Integer(*year),
            });
        }
        YearConstraint::PerGeography(latest) => {
            if latest.is_empty() {
                return None;
            }
            let pairs = latest
                .iter()
                .map(|(geography, year)| {
                    vec![
                        Predicate::Eq {
                            column: EstimateColumn::Geography,
                            value: SqlValue::text(geography.clone()),
                        },
                        Predicate::Eq {
                            column: EstimateColumn::Year,
                            value: SqlValue::Integer(*year),
                        },
                    ]
                })
                .collect();
            plan = plan.filter(Predicate::AnyOf(pairs));
        }
    }

    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{
        ALL_YEARS, FIELD_CATEGORY, FIELD_GEOGRAPHY, FIELD_INDICATOR, FIELD_YEAR, MOST_RECENT_SURVEY,
    };
    use crate::infrastructure::db::connection::seeded_memory_pool;
    use crate::infrastructure::db::DbSession;

    fn ids(rows: &[Estimate]) -> Vec<i64> {
        rows.iter().map(|row| row.id).collect()
    }

    async fn run(pairs: &[(&str, &str)]) -> Vec<i64> {
        let pool = seeded_memory_pool().await;
        let mut session = DbSession::open(&pool).await.unwrap();
        let form = FormFields::from_pairs(pairs.iter().copied());
        let rows = FilterBuilder::new()
            .handle_form(&mut session, &form)
            .await
            .unwrap();
        ids(&rows)
    }

    #[test]
    fn test_selection_predicates_skip_empty_dimensions() {
        let form = FormFields::from_pairs([(FIELD_CATEGORY, "Health"), (FIELD_YEAR, "2014")]);
        let request = FilterRequest::from_form(&form);
        let predicates = selection_predicates(&request);

        assert_eq!(
            predicates,
            vec![Predicate::In {
                column: EstimateColumn::IndicatorCategory,
                values: vec![SqlValue::text("Health")],
            }]
        );
    }

    #[test]
    fn test_rows_plan_for_empty_lookup_is_none() {
        let request = FilterRequest::from_form(&FormFields::from_pairs([(FIELD_YEAR, "x")]));
        let latest = YearConstraint::PerGeography(BTreeMap::new());
        assert!(rows_plan(&request, &latest).is_none());
    }

    #[test]
    fn test_rows_plan_compiles_pairs() {
        let request =
            FilterRequest::from_form(&FormFields::from_pairs([(FIELD_CATEGORY, "Health")]));
        let pairs = [("Kenya".to_string(), 2014), ("Uganda".to_string(), 2016)];
        let latest = YearConstraint::PerGeography(BTreeMap::from(pairs));
        let plan = rows_plan(&request, &latest).unwrap();
        let query = SqlCompiler::new().compile(&plan).unwrap();

        let pair = r#"("geography" = ? AND "year" = ?)"#;
        let expected = format!(r#"WHERE "indicatorCategory" IN (?) AND ({pair} OR {pair})"#);
        assert!(query.sql.contains(&expected));
        assert!(query.sql.ends_with("ORDER BY \"id\" ASC"));
        assert_eq!(query.params.len(), 5);
    }

    #[test]
    fn test_latest_years_plan_carries_selections() {
        let form =
            FormFields::from_pairs([(FIELD_GEOGRAPHY, "Kenya"), (FIELD_INDICATOR, "Stunting")]);
        let query = SqlCompiler::new()
            .compile(&latest_years_plan(&FilterRequest::from_form(&form)))
            .unwrap();

        assert!(query.sql.starts_with("SELECT \"geography\", MAX(\"year\")"));
        assert!(query.sql.contains("GROUP BY \"geography\""));
        assert_eq!(query.params.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_form_returns_nothing() {
        assert!(run(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_category_returns_everything_in_id_order() {
        assert_eq!(
            run(&[(FIELD_YEAR, ALL_YEARS)]).await,
            vec![1, 2, 3, 4, 5, 6, 7]
        );
    }

    #[tokio::test]
    async fn test_category_selection() {
        assert_eq!(
            run(&[(FIELD_CATEGORY, "Health")]).await,
            vec![1, 2, 3, 4, 5]
        );
        assert!(run(&[(FIELD_CATEGORY, "Nutrition")]).await.is_empty());
    }

    #[tokio::test]
    async fn test_all_dimensions_combined() {
        let rows = run(&[
            (FIELD_CATEGORY, "Health"),
            (FIELD_GEOGRAPHY, "Kenya"),
            (FIELD_INDICATOR, "Stunting"),
            (FIELD_YEAR, "2014"),
        ])
        .await;
        assert_eq!(rows, vec![2]);
    }

    #[tokio::test]
    async fn test_exact_year() {
        assert_eq!(run(&[(FIELD_YEAR, "2014")]).await, vec![2, 3, 6]);
    }

    #[tokio::test]
    async fn test_most_recent_is_per_geography() {
        let rows = run(&[(FIELD_CATEGORY, "Health"), (FIELD_YEAR, MOST_RECENT_SURVEY)]).await;
        assert_eq!(rows, vec![2, 3, 5]);
    }

    #[tokio::test]
    async fn test_most_recent_with_no_matches() {
        let rows = run(&[
            (FIELD_CATEGORY, "Nutrition"),
            (FIELD_YEAR, MOST_RECENT_SURVEY),
        ])
        .await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_fields_are_unconstrained() {
        let rows = run(&[
            (FIELD_CATEGORY, "  "),
            (FIELD_YEAR, "sometime"),
            ("unexpected", "value"),
        ])
        .await;
        assert_eq!(rows.len(), 7);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let pool = seeded_memory_pool().await;
        let mut session = DbSession::open(&pool).await.unwrap();
        let form =
            FormFields::from_pairs([(FIELD_CATEGORY, "Health"), (FIELD_YEAR, MOST_RECENT_SURVEY)]);
        let builder = FilterBuilder::new();

        let first = builder.handle_form(&mut session, &form).await.unwrap();
        let second = builder.handle_form(&mut session, &form).await.unwrap();
        assert_eq!(first, second);
    }
}
