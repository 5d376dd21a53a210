//! SQL Compiler for estimate queries
//!
//! This module compiles QueryPlan structures over the `Estimates` table into
//! parameterized SQLite queries.
//! Key properties:
//! - Always uses parameter binding (no string concatenation of values)
//! - Columns come from the closed `EstimateColumn` set
//! - SELECT-only verification on the final text

use crate::domain::error::{AppError, Result};
use crate::domain::estimate::{EstimateColumn, ESTIMATES_TABLE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A bound parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
}

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }
}

/// One condition of a conjunctive WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = ?`
    Eq {
        column: EstimateColumn,
        value: SqlValue,
    },
    /// `column IN (?, ?, ...)`
    In {
        column: EstimateColumn,
        values: Vec<SqlValue>,
    },
    /// `(a AND b) OR (c AND d) ...`
    AnyOf(Vec<Vec<Predicate>>),
}

/// What the query returns
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Full rows with the listed columns
    Rows(Vec<EstimateColumn>),
    /// Distinct values of one column
    Distinct(EstimateColumn),
    /// `group, MAX(max)` grouped by `group`
    MaxPerGroup {
        group: EstimateColumn,
        max: EstimateColumn,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: EstimateColumn,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: EstimateColumn) -> Self {
        Self {
            column,
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: EstimateColumn) -> Self {
        Self {
            column,
            direction: Direction::Desc,
        }
    }
}

/// Structured query over the `Estimates` table
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub projection: Projection,
    pub filters: Vec<Predicate>,
    pub order_by: Vec<OrderBy>,
}

impl QueryPlan {
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            filters: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }
}

/// Compiled SQL query with parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// The parameterized SQL query
    pub sql: String,
    /// Parameter values in placeholder order
    pub params: Vec<SqlValue>,
    /// Human-readable description of the query
    pub description: String,
}

/// SQL Compiler for generating parameterized queries from plans
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlCompiler;

impl SqlCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile a query plan into a parameterized SQL query
    pub fn compile(&self, plan: &QueryPlan) -> Result<CompiledQuery> {
        self.validate_plan(plan)?;

        let mut params = Vec::new();

        let (select_clause, group_clause) = match &plan.projection {
            Projection::Rows(columns) => (
                columns
                    .iter()
                    .map(|c| self.quote_identifier(c.name()))
                    .collect::<Vec<_>>()
                    .join(", "),
                None,
            ),
            Projection::Distinct(column) => (
                format!("DISTINCT {}", self.quote_identifier(column.name())),
                None,
            ),
            Projection::MaxPerGroup { group, max } => {
                let group = self.quote_identifier(group.name());
                (
                    format!("{}, MAX({})", group, self.quote_identifier(max.name())),
                    Some(format!("GROUP BY {}", group)),
                )
            }
        };

        let where_clause = self.build_where_clause(&plan.filters, &mut params);

        let order_clause = if plan.order_by.is_empty() {
            None
        } else {
            let terms = plan
                .order_by
                .iter()
                .map(|o| {
                    let direction = match o.direction {
                        Direction::Asc => "ASC",
                        Direction::Desc => "DESC",
                    };
                    format!("{} {}", self.quote_identifier(o.column.name()), direction)
                })
                .collect::<Vec<_>>();
            Some(format!("ORDER BY {}", terms.join(", ")))
        };

        let mut sql_parts = vec![
            format!("SELECT {}", select_clause),
            format!("FROM {}", self.quote_identifier(ESTIMATES_TABLE)),
        ];

        if !where_clause.is_empty() {
            sql_parts.push(format!("WHERE {}", where_clause));
        }

        if let Some(group) = group_clause {
            sql_parts.push(group);
        }

        if let Some(order) = order_clause {
            sql_parts.push(order);
        }

        let sql = sql_parts.join(" ");

        self.verify_select_only(&sql)?;

        let description = self.generate_description(plan);

        debug!("Compiled SQL: {} with {} params", sql, params.len());

        Ok(CompiledQuery {
            sql,
            params,
            description,
        })
    }

    /// Validate the query plan before compilation
    fn validate_plan(&self, plan: &QueryPlan) -> Result<()> {
        if let Projection::Rows(columns) = &plan.projection {
            if columns.is_empty() {
                return Err(AppError::ValidationError(
                    "Explicit column list required".to_string(),
                ));
            }
        }

        for predicate in &plan.filters {
            self.validate_predicate(predicate)?;
        }

        Ok(())
    }

    fn validate_predicate(&self, predicate: &Predicate) -> Result<()> {
        match predicate {
            Predicate::Eq { .. } => Ok(()),
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return Err(AppError::ValidationError(format!(
                        "Empty IN list for column: {}",
                        column.name()
                    )));
                }
                Ok(())
            }
            Predicate::AnyOf(groups) => {
                if groups.is_empty() || groups.iter().any(Vec::is_empty) {
                    return Err(AppError::ValidationError(
                        "Empty alternative in OR predicate".to_string(),
                    ));
                }
                groups
                    .iter()
                    .flatten()
                    .try_for_each(|p| self.validate_predicate(p))
            }
        }
    }

    /// Quote an identifier (table or column name)
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Build WHERE clause from filters
    fn build_where_clause(&self, filters: &[Predicate], params: &mut Vec<SqlValue>) -> String {
        filters
            .iter()
            .map(|filter| self.build_condition(filter, params))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Build a single condition
    fn build_condition(&self, predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
        match predicate {
            Predicate::Eq { column, value } => {
                params.push(value.clone());
                format!("{} = ?", self.quote_identifier(column.name()))
            }
            Predicate::In { column, values } => {
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!(
                    "{} IN ({})",
                    self.quote_identifier(column.name()),
                    placeholders
                )
            }
            Predicate::AnyOf(groups) => {
                let alternatives = groups
                    .iter()
                    .map(|group| format!("({})", self.build_where_clause(group, params)))
                    .collect::<Vec<_>>();
                format!("({})", alternatives.join(" OR "))
            }
        }
    }

    /// Verify that the compiled SQL is SELECT-only
    fn verify_select_only(&self, sql: &str) -> Result<()> {
        let sql_upper = sql.trim().to_uppercase();

        if !sql_upper.starts_with("SELECT") {
            return Err(AppError::ValidationError(
                "Query must start with SELECT".to_string(),
            ));
        }

        let forbidden = [
            "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "PRAGMA", "ATTACH", "DETACH",
        ];

        for keyword in &forbidden {
            if self.contains_whole_word(&sql_upper, keyword) {
                return Err(AppError::ValidationError(format!(
                    "SQL contains forbidden keyword: {}",
                    keyword
                )));
            }
        }

        Ok(())
    }

    /// Check if a string contains a keyword as a whole word (not as substring)
    fn contains_whole_word(&self, text: &str, keyword: &str) -> bool {
        let text_bytes = text.as_bytes();
        let keyword_bytes = keyword.as_bytes();

        if keyword_bytes.len() > text_bytes.len() {
            return false;
        }

        (0..=(text_bytes.len() - keyword_bytes.len())).any(|i| {
            let end = i + keyword_bytes.len();
            &text_bytes[i..end] == keyword_bytes
                && (i == 0 || !text_bytes[i - 1].is_ascii_alphanumeric())
                && (end == text_bytes.len() || !text_bytes[end].is_ascii_alphanumeric())
        })
    }

    /// Generate a human-readable description of the query
    fn generate_description(&self, plan: &QueryPlan) -> String {
        let mut desc = match &plan.projection {
            Projection::Rows(columns) => {
                format!("Select {} columns from {}", columns.len(), ESTIMATES_TABLE)
            }
            Projection::Distinct(column) => {
                format!("Distinct {} from {}", column.name(), ESTIMATES_TABLE)
            }
            Projection::MaxPerGroup { group, max } => format!(
                "Max {} per {} from {}",
                max.name(),
                group.name(),
                ESTIMATES_TABLE
            ),
        };

        if !plan.filters.is_empty() {
            let filter_desc: Vec<String> = plan.filters.iter().map(describe_predicate).collect();
            desc.push_str(&format!(" where {}", filter_desc.join(" and ")));
        }

        desc
    }
}

fn describe_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Eq { column, .. } => format!("{} eq", column.name()),
        Predicate::In { column, values } => format!("{} in {} values", column.name(), values.len()),
        Predicate::AnyOf(groups) => format!("any of {} alternatives", groups.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_filter(column: EstimateColumn, values: &[&str]) -> Predicate {
        Predicate::In {
            column,
            values: values.iter().map(|v| SqlValue::text(*v)).collect(),
        }
    }

    #[test]
    fn test_rows_without_filters() {
        let columns = vec![EstimateColumn::Id, EstimateColumn::IndicatorName];
        let plan = QueryPlan::new(Projection::Rows(columns))
            .order_by(OrderBy::asc(EstimateColumn::Id));

        let query = SqlCompiler::new().compile(&plan).unwrap();
        assert_eq!(
            query.sql,
            "SELECT \"id\", \"indicatorName\" FROM \"Estimates\" ORDER BY \"id\" ASC"
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_in_clause_binds_each_value() {
        let categories = in_filter(EstimateColumn::IndicatorCategory, &["Health", "Education"]);
        let plan = QueryPlan::new(Projection::Rows(vec![EstimateColumn::Id]))
            .filter(categories)
            .filter(in_filter(EstimateColumn::Geography, &["Kenya"]));

        let query = SqlCompiler::new().compile(&plan).unwrap();
        let expected = r#"WHERE "indicatorCategory" IN (?, ?) AND "geography" IN (?)"#;
        assert!(query.sql.contains(expected));
        assert_eq!(
            query.params,
            vec![
                SqlValue::text("Health"),
                SqlValue::text("Education"),
                SqlValue::text("Kenya"),
            ]
        );
    }

    #[test]
    fn test_values_never_inlined() {
        let hostile = ["x'; DROP TABLE Estimates; --"];
        let plan = QueryPlan::new(Projection::Distinct(EstimateColumn::IndicatorName))
            .filter(in_filter(EstimateColumn::IndicatorCategory, &hostile));

        let query = SqlCompiler::new().compile(&plan).unwrap();
        assert!(!query.sql.contains("DROP"));
        assert!(query.sql.starts_with("SELECT DISTINCT \"indicatorName\""));
    }

    #[test]
    fn test_any_of_groups() {
        let groups = vec![
            vec![
                Predicate::Eq {
                    column: EstimateColumn::Geography,
                    value: SqlValue::text("Kenya"),
                },
                Predicate::Eq {
                    column: EstimateColumn::Year,
                    value: SqlValue::Integer(2014),
                },
            ],
            vec![
                Predicate::Eq {
                    column: EstimateColumn::Geography,
                    value: SqlValue::text("Uganda"),
                },
                Predicate::Eq {
                    column: EstimateColumn::Year,
                    value: SqlValue::Integer(2016),
                },
            ],
        ];
        let plan = QueryPlan::new(Projection::Rows(vec![EstimateColumn::Id]))
            .filter(Predicate::AnyOf(groups));

        let query = SqlCompiler::new().compile(&plan).unwrap();
        let pair = r#"("geography" = ? AND "year" = ?)"#;
        assert!(query.sql.ends_with(&format!("WHERE ({pair} OR {pair})")));
        assert_eq!(query.params.len(), 4);
        assert_eq!(query.params[3], SqlValue::Integer(2016));
    }

    #[test]
    fn test_max_per_group() {
        let plan = QueryPlan::new(Projection::MaxPerGroup {
            group: EstimateColumn::Geography,
            max: EstimateColumn::Year,
        })
        .order_by(OrderBy::asc(EstimateColumn::Geography));

        let query = SqlCompiler::new().compile(&plan).unwrap();
        let expected = concat!(
            r#"SELECT "geography", MAX("year") FROM "Estimates" "#,
            r#"GROUP BY "geography" ORDER BY "geography" ASC"#
        );
        assert_eq!(query.sql, expected);
    }

    #[test]
    fn test_reject_empty_lists() {
        let compiler = SqlCompiler::new();
        let empty_in = QueryPlan::new(Projection::Rows(vec![EstimateColumn::Id]))
            .filter(in_filter(EstimateColumn::Geography, &[]));
        assert!(compiler.compile(&empty_in).is_err());

        let empty_any = QueryPlan::new(Projection::Rows(vec![EstimateColumn::Id]))
            .filter(Predicate::AnyOf(Vec::new()));
        assert!(compiler.compile(&empty_any).is_err());

        let no_columns = QueryPlan::new(Projection::Rows(Vec::new()));
        assert!(compiler.compile(&no_columns).is_err());
    }

    #[test]
    fn test_whole_word_keyword_detection() {
        let compiler = SqlCompiler::new();
        assert!(compiler.contains_whole_word("DROP TABLE ESTIMATES", "DROP"));
        assert!(!compiler.contains_whole_word("DROPDOWN", "DROP"));
        assert!(!compiler.contains_whole_word("\"CREATED_AT\"", "CREATE"));
        assert!(compiler.contains_whole_word("X; DELETE FROM Y", "DELETE"));
    }
}
