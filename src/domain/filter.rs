use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const FIELD_CATEGORY: &str = "indicatorCategory";
pub const FIELD_GEOGRAPHY: &str = "geography";
pub const FIELD_INDICATOR: &str = "indicatorName";
pub const FIELD_YEAR: &str = "year";

pub const ALL_YEARS: &str = "All Years";
pub const MOST_RECENT_SURVEY: &str = "Most Recent Survey";

/// Submitted form state: every field name maps to the values sent for it,
/// in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Self::new();
        for (key, value) in pairs {
            fields.append(key, value);
        }
        fields
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    pub fn extend(&mut self, other: FormFields) {
        for (key, values) in other.fields {
            self.fields.entry(key).or_default().extend(values);
        }
    }

    pub fn get_list(&self, key: &str) -> &[String] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_list(key).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every submitted `(name, value)` pair, grouped by name.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }
}

/// Year condition applied to a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YearSelection {
    #[default]
    AllYears,
    MostRecent,
    Exact(i64),
}

impl YearSelection {
    /// Unknown or unparseable selections fall back to no constraint.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return YearSelection::AllYears;
        };

        if raw.eq_ignore_ascii_case(MOST_RECENT_SURVEY) {
            return YearSelection::MostRecent;
        }

        raw.parse::<i64>()
            .map(YearSelection::Exact)
            .unwrap_or(YearSelection::AllYears)
    }
}

/// Filter state derived from one request's form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    pub categories: BTreeSet<String>,
    pub geographies: BTreeSet<String>,
    pub indicators: BTreeSet<String>,
    pub year: YearSelection,
    /// False when the form carried no fields at all.
    pub submitted: bool,
}

impl FilterRequest {
    pub fn from_form(form: &FormFields) -> Self {
        Self {
            categories: selection(form, FIELD_CATEGORY),
            geographies: selection(form, FIELD_GEOGRAPHY),
            indicators: selection(form, FIELD_INDICATOR),
            year: YearSelection::parse(form.first(FIELD_YEAR)),
            submitted: !form.is_empty(),
        }
    }
}

fn selection(form: &FormFields, key: &str) -> BTreeSet<String> {
    form.get_list(key)
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_selection_parse() {
        assert_eq!(YearSelection::parse(None), YearSelection::AllYears);
        assert_eq!(YearSelection::parse(Some("")), YearSelection::AllYears);
        assert_eq!(
            YearSelection::parse(Some(ALL_YEARS)),
            YearSelection::AllYears
        );
        assert_eq!(
            YearSelection::parse(Some("Most Recent Survey")),
            YearSelection::MostRecent
        );
        assert_eq!(
            YearSelection::parse(Some(" 2016 ")),
            YearSelection::Exact(2016)
        );
        assert_eq!(
            YearSelection::parse(Some("last year")),
            YearSelection::AllYears
        );
    }

    #[test]
    fn test_selections_are_trimmed_and_deduplicated() {
        let form = FormFields::from_pairs([
            (FIELD_CATEGORY, "Health"),
            (FIELD_CATEGORY, " Health "),
            (FIELD_CATEGORY, ""),
            (FIELD_GEOGRAPHY, "Kenya"),
        ]);
        let request = FilterRequest::from_form(&form);

        assert_eq!(request.categories.len(), 1);
        assert!(request.categories.contains("Health"));
        assert_eq!(request.geographies.len(), 1);
        assert!(request.indicators.is_empty());
        assert_eq!(request.year, YearSelection::AllYears);
        assert!(request.submitted);
    }

    #[test]
    fn test_empty_form_is_not_submitted() {
        let request = FilterRequest::from_form(&FormFields::new());
        assert!(!request.submitted);
        assert!(request.categories.is_empty());
    }

    #[test]
    fn test_extend_merges_values() {
        let mut form = FormFields::from_pairs([(FIELD_CATEGORY, "Health")]);
        form.extend(FormFields::from_pairs([(FIELD_CATEGORY, "Education")]));
        assert_eq!(form.get_list(FIELD_CATEGORY), ["Health", "Education"]);
        assert_eq!(form.first(FIELD_CATEGORY), Some("Health"));
        assert!(form.get_list(FIELD_YEAR).is_empty());
    }
}
