//! Choices shown by the filter form on the index page.

use serde::Serialize;

use crate::application::use_cases::filter_builder::selection_predicates;
use crate::application::use_cases::sql_compiler::{
    OrderBy, Predicate, Projection, QueryPlan, SqlCompiler,
};
use crate::domain::error::Result;
use crate::domain::estimate::EstimateColumn;
use crate::domain::filter::{FilterRequest, FormFields, ALL_YEARS, MOST_RECENT_SURVEY};
use crate::infrastructure::db::EstimateStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexView {
    pub indicators: Vec<String>,
    pub geography: Vec<String>,
    pub indicator_category: Vec<String>,
    pub years: Vec<String>,
    pub go_disabled: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FilterOptions {
    compiler: SqlCompiler,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self {
            compiler: SqlCompiler::new(),
        }
    }

    /// Categories and years are always listed. Geographies and indicator
    /// names only appear once at least one category is selected, and the
    /// indicator names are limited to those categories.
    pub async fn build<S>(&self, store: &mut S, form: &FormFields) -> Result<IndexView>
    where
        S: EstimateStore + ?Sized,
    {
        let categories = self
            .distinct_text(store, EstimateColumn::IndicatorCategory, None)
            .await?;
        let years = self.year_options(store).await?;

        let mut view = IndexView {
            indicators: Vec::new(),
            geography: Vec::new(),
            indicator_category: categories,
            years,
            go_disabled: true,
        };

        let request = FilterRequest::from_form(form);
        if !request.submitted || request.categories.is_empty() {
            return Ok(view);
        }

        view.geography = self
            .distinct_text(store, EstimateColumn::Geography, None)
            .await?;

        let category_only = FilterRequest {
            categories: request.categories,
            ..FilterRequest::default()
        };
        let category_filter = selection_predicates(&category_only).into_iter().next();

        view.indicators = self
            .distinct_text(store, EstimateColumn::IndicatorName, category_filter)
            .await?;
        view.go_disabled = view.indicators.is_empty();

        Ok(view)
    }

    async fn distinct_text<S>(
        &self,
        store: &mut S,
        column: EstimateColumn,
        filter: Option<Predicate>,
    ) -> Result<Vec<String>>
    where
        S: EstimateStore + ?Sized,
    {
        let mut plan = QueryPlan::new(Projection::Distinct(column)).order_by(OrderBy::asc(column));
        if let Some(filter) = filter {
            plan = plan.filter(filter);
        }
        store
            .fetch_text_column(&self.compiler.compile(&plan)?)
            .await
    }

    /// The two fixed choices, then every year present, newest first.
    async fn year_options<S>(&self, store: &mut S) -> Result<Vec<String>>
    where
        S: EstimateStore + ?Sized,
    {
        let plan = QueryPlan::new(Projection::Distinct(EstimateColumn::Year))
            .order_by(OrderBy::desc(EstimateColumn::Year));
        let years = store
            .fetch_integer_column(&self.compiler.compile(&plan)?)
            .await?;

        Ok([ALL_YEARS.to_string(), MOST_RECENT_SURVEY.to_string()]
            .into_iter()
            .chain(years.into_iter().map(|year| year.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{FIELD_CATEGORY, FIELD_YEAR};
    use crate::infrastructure::db::connection::seeded_memory_pool;
    use crate::infrastructure::db::DbSession;

    async fn build(pairs: &[(&str, &str)]) -> IndexView {
        let pool = seeded_memory_pool().await;
        let mut session = DbSession::open(&pool).await.unwrap();
        FilterOptions::new()
            .build(&mut session, &FormFields::from_pairs(pairs.iter().copied()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_no_form_lists_categories_only() {
        let view = build(&[]).await;
        assert_eq!(view.indicator_category, vec!["Education", "Health"]);
        assert!(view.indicators.is_empty());
        assert!(view.geography.is_empty());
        assert!(view.go_disabled);
        assert_eq!(
            view.years,
            vec![
                "All Years",
                "Most Recent Survey",
                "2016",
                "2014",
                "2011",
                "2008",
            ]
        );
    }

    #[tokio::test]
    async fn test_selected_category_enables_go() {
        let view = build(&[(FIELD_CATEGORY, "Health")]).await;
        assert_eq!(view.indicators, vec!["Stunting", "Wasting"]);
        assert_eq!(view.geography, vec!["Kenya", "Uganda"]);
        assert!(!view.go_disabled);
    }

    #[tokio::test]
    async fn test_unknown_category_keeps_go_disabled() {
        let view = build(&[(FIELD_CATEGORY, "Nutrition")]).await;
        assert!(view.indicators.is_empty());
        assert_eq!(view.geography, vec!["Kenya", "Uganda"]);
        assert!(view.go_disabled);
    }

    #[tokio::test]
    async fn test_form_without_category_lists_nothing_extra() {
        let view = build(&[(FIELD_YEAR, "2014")]).await;
        assert!(view.geography.is_empty());
        assert!(view.go_disabled);
    }

    #[tokio::test]
    async fn test_indicators_stay_within_selected_categories() {
        let view = build(&[(FIELD_CATEGORY, "Education")]).await;
        assert_eq!(view.indicators, vec!["Literacy"]);
    }
}
