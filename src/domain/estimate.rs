use serde::{Deserialize, Serialize};

pub const ESTIMATES_TABLE: &str = "Estimates";
pub const GEN_CONS_TABLE: &str = "GenCons";

/// Columns of the `Estimates` table in schema order, primary key first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimateColumn {
    Id,
    IndicatorCategory,
    IndicatorName,
    Geography,
    Year,
    Survey,
    Value,
    StandardError,
    SampleSize,
    Source,
}

impl EstimateColumn {
    pub const ALL: [EstimateColumn; 10] = [
        EstimateColumn::Id,
        EstimateColumn::IndicatorCategory,
        EstimateColumn::IndicatorName,
        EstimateColumn::Geography,
        EstimateColumn::Year,
        EstimateColumn::Survey,
        EstimateColumn::Value,
        EstimateColumn::StandardError,
        EstimateColumn::SampleSize,
        EstimateColumn::Source,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EstimateColumn::Id => "id",
            EstimateColumn::IndicatorCategory => "indicatorCategory",
            EstimateColumn::IndicatorName => "indicatorName",
            EstimateColumn::Geography => "geography",
            EstimateColumn::Year => "year",
            EstimateColumn::Survey => "survey",
            EstimateColumn::Value => "value",
            EstimateColumn::StandardError => "standardError",
            EstimateColumn::SampleSize => "sampleSize",
            EstimateColumn::Source => "source",
        }
    }

    /// Columns offered for export: everything except the primary key.
    pub fn exported() -> &'static [EstimateColumn] {
        &Self::ALL[1..]
    }
}

/// One row of survey-derived indicator data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub id: i64,
    pub indicator_category: String,
    pub indicator_name: String,
    pub geography: String,
    pub year: i64,
    pub survey: Option<String>,
    pub value: f64,
    pub standard_error: Option<f64>,
    pub sample_size: Option<i64>,
    pub source: Option<String>,
}

impl Estimate {
    /// Textual form of a single field. Missing values render as an empty string.
    pub fn text_value(&self, column: EstimateColumn) -> String {
        match column {
            EstimateColumn::Id => self.id.to_string(),
            EstimateColumn::IndicatorCategory => self.indicator_category.clone(),
            EstimateColumn::IndicatorName => self.indicator_name.clone(),
            EstimateColumn::Geography => self.geography.clone(),
            EstimateColumn::Year => self.year.to_string(),
            EstimateColumn::Survey => self.survey.clone().unwrap_or_default(),
            EstimateColumn::Value => self.value.to_string(),
            EstimateColumn::StandardError => optional_text(self.standard_error),
            EstimateColumn::SampleSize => optional_text(self.sample_size),
            EstimateColumn::Source => self.source.clone().unwrap_or_default(),
        }
    }

    pub fn text_values(&self, columns: &[EstimateColumn]) -> Vec<String> {
        columns
            .iter()
            .map(|column| self.text_value(*column))
            .collect()
    }
}

fn optional_text<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// A documented methodological note about how estimates were derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralConstruction {
    pub id: i64,
    pub topic: String,
    pub decision: String,
    pub rationale: Option<String>,
}
