//! Filtered views over a table.
//!
//! A [`FilterSpec`] describes exactly one active filter. Deriving a view
//! never touches the input table.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, TableError};
use crate::types::ColumnKind;
use crate::utils::{numeric_values, string_values, temporal_values};

/// The active filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Pass every row through.
    #[default]
    All,
    /// Rows whose stringified value is one of `values`.
    Values { column: String, values: Vec<String> },
    /// Rows whose numeric value lies in `[min, max]`.
    Range { column: String, min: f64, max: f64 },
    /// Rows whose date lies in `[start, end]`, by calendar day.
    DateRange {
        column: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Rows whose stringified value contains `term`, ignoring case.
    Contains { column: String, term: String },
}

impl FilterSpec {
    /// The filtered column, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Values { column, .. }
            | Self::Range { column, .. }
            | Self::DateRange { column, .. }
            | Self::Contains { column, .. } => Some(column.as_str()),
        }
    }
}

/// The widget a front end should offer for filtering a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterControl {
    /// Slider over the column's observed bounds.
    Range { min: f64, max: f64 },
    /// Date picker over the first and last observed day.
    DateRange { start: NaiveDate, end: NaiveDate },
    /// Free-text search box.
    Search,
}

impl FilterControl {
    /// The filter matching the control's initial, widest setting.
    pub fn initial_spec(&self, column: &str) -> FilterSpec {
        match self {
            Self::Range { min, max } => FilterSpec::Range {
                column: column.to_string(),
                min: *min,
                max: *max,
            },
            Self::DateRange { start, end } => FilterSpec::DateRange {
                column: column.to_string(),
                start: *start,
                end: *end,
            },
            Self::Search => FilterSpec::Contains {
                column: column.to_string(),
                term: String::new(),
            },
        }
    }
}

fn column_series<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series> {
    df.column(column)
        .map(|col| col.as_materialized_series())
        .map_err(|_| TableError::ColumnNotFound(column.to_string()))
}

fn apply_mask(df: &DataFrame, mask: Vec<bool>) -> Result<DataFrame> {
    let mask = Series::new("mask".into(), mask);
    Ok(df.filter(mask.bool()?)?)
}

/// Derive the view of `df` selected by `spec`.
pub fn derive_filtered_view(df: &DataFrame, spec: &FilterSpec) -> Result<DataFrame> {
    let mask: Vec<bool> = match spec {
        FilterSpec::All => return Ok(df.clone()),
        FilterSpec::Values { column, values } => {
            let series = column_series(df, column)?;
            if values.is_empty() {
                return Ok(df.clone());
            }
            let selected: HashSet<&str> = values.iter().map(String::as_str).collect();
            string_values(series)?
                .iter()
                .map(|v| v.as_deref().is_some_and(|v| selected.contains(v)))
                .collect()
        }
        FilterSpec::Range { column, min, max } => {
            let series = column_series(df, column)?;
            let kind = ColumnKind::of_series(series);
            if !kind.is_numeric() {
                return Err(TableError::invalid_filter(
                    column.as_str(),
                    format!("range filters need a numeric column, found {kind}"),
                ));
            }
            if min > max {
                return Err(TableError::invalid_filter(
                    column.as_str(),
                    format!("minimum {min} is greater than maximum {max}"),
                ));
            }
            numeric_values(series)?
                .into_iter()
                .map(|v| v.is_some_and(|v| *min <= v && v <= *max))
                .collect()
        }
        FilterSpec::DateRange { column, start, end } => {
            let series = column_series(df, column)?;
            let kind = ColumnKind::of_series(series);
            if kind != ColumnKind::Datetime {
                return Err(TableError::invalid_filter(
                    column.as_str(),
                    format!("date filters need a datetime column, found {kind}"),
                ));
            }
            if start > end {
                return Err(TableError::invalid_filter(
                    column.as_str(),
                    format!("start {start} is after end {end}"),
                ));
            }
            temporal_values(series)?
                .into_iter()
                .map(|v| v.is_some_and(|dt| (*start..=*end).contains(&dt.date())))
                .collect()
        }
        FilterSpec::Contains { column, term } => {
            let series = column_series(df, column)?;
            if term.is_empty() {
                return Ok(df.clone());
            }
            let needle = term.to_lowercase();
            string_values(series)?
                .iter()
                .map(|v| v.as_deref().is_some_and(|v| v.to_lowercase().contains(&needle)))
                .collect()
        }
    };

    let view = apply_mask(df, mask)?;
    debug!(
        "Filter on {:?} kept {} of {} rows",
        spec.column(),
        view.height(),
        df.height()
    );
    Ok(view)
}

/// Choose the filter widget for a column.
///
/// Numeric columns get a range slider and datetime columns a date picker,
/// both bounded by the observed values. Everything else, including numeric
/// or datetime columns with no values, gets a search box.
pub fn filter_control(df: &DataFrame, column: &str) -> Result<FilterControl> {
    let series = column_series(df, column)?;

    match ColumnKind::of_series(series) {
        kind if kind.is_numeric() => {
            let values: Vec<f64> = numeric_values(series)?
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan())
                .collect();
            let min = values.iter().copied().reduce(f64::min);
            let max = values.iter().copied().reduce(f64::max);
            match (min, max) {
                (Some(min), Some(max)) => Ok(FilterControl::Range { min, max }),
                _ => Ok(FilterControl::Search),
            }
        }
        ColumnKind::Datetime => {
            let days: Vec<NaiveDate> = temporal_values(series)?
                .into_iter()
                .flatten()
                .map(|dt| dt.date())
                .collect();
            match (days.iter().min(), days.iter().max()) {
                (Some(start), Some(end)) => Ok(FilterControl::DateRange {
                    start: *start,
                    end: *end,
                }),
                _ => Ok(FilterControl::Search),
            }
        }
        _ => Ok(FilterControl::Search),
    }
}

/// Sorted distinct non-missing values of a column, stringified.
///
/// Numeric columns sort by value, everything else lexicographically.
pub fn distinct_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let series = column_series(df, column)?;
    let strings = string_values(series)?;
    let numbers = if ColumnKind::of_series(series).is_numeric() {
        numeric_values(series)?
    } else {
        vec![None; strings.len()]
    };

    let mut seen = HashSet::new();
    let mut unique: Vec<(Option<f64>, String)> = Vec::new();
    for (text, number) in strings.into_iter().zip(numbers) {
        if let Some(text) = text
            && seen.insert(text.clone())
        {
            unique.push((number, text));
        }
    }

    unique.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.1.cmp(&b.1),
    });

    Ok(unique.into_iter().map(|(_, text)| text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df![
            "city" => [Some("Paris"), Some("Berlin"), None, Some("paris"), Some("Rome")],
            "age" => [Some(30i64), Some(45), Some(22), None, Some(60)],
            "score" => [1.5f64, 2.0, 3.5, 4.0, 0.5],
        ]
        .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_is_identity() {
        let df = sample();
        let view = derive_filtered_view(&df, &FilterSpec::All).unwrap();
        assert!(view.equals_missing(&df));
    }

    #[test]
    fn test_values_filter() {
        let df = sample();
        let spec = FilterSpec::Values {
            column: "city".into(),
            values: vec!["Paris".into(), "Rome".into()],
        };
        let view = derive_filtered_view(&df, &spec).unwrap();
        assert_eq!(view.height(), 2);
        // input untouched
        assert_eq!(df.height(), 5);
    }

    #[test]
    fn test_values_filter_empty_selection_passes_all() {
        let df = sample();
        let spec = FilterSpec::Values {
            column: "city".into(),
            values: vec![],
        };
        assert_eq!(derive_filtered_view(&df, &spec).unwrap().height(), 5);
    }

    #[test]
    fn test_values_filter_on_numbers() {
        let df = sample();
        let spec = FilterSpec::Values {
            column: "age".into(),
            values: vec!["45".into()],
        };
        assert_eq!(derive_filtered_view(&df, &spec).unwrap().height(), 1);
    }

    #[test]
    fn test_range_filter_inclusive() {
        let df = sample();
        let spec = FilterSpec::Range {
            column: "age".into(),
            min: 30.0,
            max: 45.0,
        };
        let view = derive_filtered_view(&df, &spec).unwrap();
        let ages: Vec<Option<i64>> = view
            .column("age")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ages, vec![Some(30), Some(45)]);
    }

    #[test]
    fn test_range_filter_rejects_text_column() {
        let df = sample();
        let spec = FilterSpec::Range {
            column: "city".into(),
            min: 0.0,
            max: 1.0,
        };
        let err = derive_filtered_view(&df, &spec).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTER");
    }

    #[test]
    fn test_range_filter_rejects_inverted_bounds() {
        let df = sample();
        let spec = FilterSpec::Range {
            column: "score".into(),
            min: 3.0,
            max: 1.0,
        };
        let err = derive_filtered_view(&df, &spec).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTER");
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let df = sample();
        let spec = FilterSpec::Contains {
            column: "city".into(),
            term: "PAR".into(),
        };
        assert_eq!(derive_filtered_view(&df, &spec).unwrap().height(), 2);

        let spec = FilterSpec::Contains {
            column: "city".into(),
            term: String::new(),
        };
        assert_eq!(derive_filtered_view(&df, &spec).unwrap().height(), 5);
    }

    #[test]
    fn test_unknown_column() {
        let df = sample();
        let spec = FilterSpec::Contains {
            column: "nope".into(),
            term: "x".into(),
        };
        let err = derive_filtered_view(&df, &spec).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_date_range_inclusive_by_day() {
        let df = df![
            "when" => ["2024-01-01 08:00:00", "2024-01-02 23:59:00", "2024-01-03 00:00:00"],
        ]
        .unwrap();
        let df = crate::cleaner::TableCleaner
            .convert(&df, "when", crate::types::TargetType::Datetime)
            .unwrap()
            .0;

        let spec = FilterSpec::DateRange {
            column: "when".into(),
            start: day(2024, 1, 1),
            end: day(2024, 1, 2),
        };
        assert_eq!(derive_filtered_view(&df, &spec).unwrap().height(), 2);
    }

    #[test]
    fn test_filter_control_by_kind() {
        let df = sample();
        assert_eq!(
            filter_control(&df, "age").unwrap(),
            FilterControl::Range {
                min: 22.0,
                max: 60.0
            }
        );
        assert_eq!(filter_control(&df, "city").unwrap(), FilterControl::Search);
    }

    #[test]
    fn test_filter_control_initial_spec_keeps_present_rows() {
        let df = sample();
        let control = filter_control(&df, "age").unwrap();
        let view = derive_filtered_view(&df, &control.initial_spec("age")).unwrap();
        assert_eq!(view.height(), 4);
    }

    #[test]
    fn test_distinct_values_sorted() {
        let df = df![
            "n" => [10i64, 2, 10, 33],
            "s" => ["b", "a", "b", "c"],
        ]
        .unwrap();
        assert_eq!(distinct_values(&df, "n").unwrap(), vec!["2", "10", "33"]);
        assert_eq!(distinct_values(&df, "s").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_subsecond_datetimes_stay_distinct() {
        let df = df![
            "at" => ["2024-01-05 10:00:00.100", "2024-01-05 10:00:00.900"],
        ]
        .unwrap();
        let df = crate::cleaner::TableCleaner
            .convert(&df, "at", crate::types::TargetType::Datetime)
            .unwrap()
            .0;

        let options = distinct_values(&df, "at").unwrap();
        assert_eq!(
            options,
            vec!["2024-01-05 10:00:00.100", "2024-01-05 10:00:00.900"]
        );

        let spec = FilterSpec::Values {
            column: "at".into(),
            values: vec![options[0].clone()],
        };
        assert_eq!(derive_filtered_view(&df, &spec).unwrap().height(), 1);
    }

    #[test]
    fn test_filter_spec_serde() {
        let spec = FilterSpec::Range {
            column: "age".into(),
            min: 1.0,
            max: 2.0,
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"kind\":\"range\""));
        let back: FilterSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
