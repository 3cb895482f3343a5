//! Date standardization for text and temporal columns.

use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::debug;

use crate::config::DateFormat;
use crate::error::Result;
use crate::utils::{parse_datetime_str, temporal_values};

/// Reformat every date-like column as text in `format`.
///
/// A column is reformatted when at least one value parses and the parsed
/// share of non-missing values reaches `min_ratio`. Values that fail to
/// parse become missing. Returns the names of the reformatted columns.
pub(crate) fn standardize_dates(
    df: DataFrame,
    format: DateFormat,
    min_ratio: f64,
) -> Result<(DataFrame, Vec<String>)> {
    let mut df = df;
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut formatted = Vec::new();

    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let Some(parsed) = parse_column(&series, format)? else {
            continue;
        };

        let non_missing = series.len() - series.null_count();
        let parsed_count = parsed.iter().filter(|v| v.is_some()).count();
        if parsed_count == 0 {
            continue;
        }

        let ratio = parsed_count as f64 / non_missing as f64;
        if ratio < min_ratio {
            debug!(
                "Column '{}': {:.1}% of values parse as dates, below threshold",
                col_name,
                ratio * 100.0
            );
            continue;
        }

        let values: Vec<Option<String>> = parsed
            .into_iter()
            .map(|opt| opt.map(|dt| dt.format(format.pattern()).to_string()))
            .collect();

        let lost = non_missing - parsed_count;
        if lost > 0 {
            debug!(
                "Column '{}': {} unparseable values set to missing",
                col_name, lost
            );
        }

        df.replace(col_name, Series::new(col_name.as_str().into(), values))?;
        debug!("Formatted column '{}' as {}", col_name, format);
        formatted.push(col_name.clone());
    }

    Ok((df, formatted))
}

/// Parse a candidate column; `None` for columns that are never date
/// candidates.
fn parse_column(
    series: &Series,
    format: DateFormat,
) -> PolarsResult<Option<Vec<Option<NaiveDateTime>>>> {
    match series.dtype() {
        DataType::String => Ok(Some(
            series
                .str()?
                .into_iter()
                .map(|opt| opt.and_then(|v| parse_datetime_str(v, Some(format.pattern()))))
                .collect(),
        )),
        DataType::Date | DataType::Datetime(_, _) => Ok(Some(temporal_values(series)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reformats_text_dates() {
        let df = df![
            "joined" => ["2024-01-05", "2023-12-31"],
        ]
        .unwrap();

        let (df, cols) = standardize_dates(df, DateFormat::DayMonthYear, 0.0).unwrap();
        assert_eq!(cols, vec!["joined"]);

        let values: Vec<Option<&str>> = df
            .column("joined")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some("05-01-2024"), Some("31-12-2023")]);
    }

    #[test]
    fn test_unparsed_values_become_missing() {
        let df = df![
            "when" => [Some("2024-01-05"), Some("soon"), None],
        ]
        .unwrap();

        let (df, _) = standardize_dates(df, DateFormat::YearMonthDay, 0.0).unwrap();
        let col = df.column("when").unwrap();
        assert_eq!(col.null_count(), 2);
    }

    #[test]
    fn test_rerun_is_stable() {
        let df = df![
            "d" => ["2024-01-05", "2024-02-10"],
        ]
        .unwrap();

        let (once, _) = standardize_dates(df, DateFormat::DayMonthYear, 0.0).unwrap();
        let (twice, _) = standardize_dates(once.clone(), DateFormat::DayMonthYear, 0.0).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_numeric_columns_are_not_candidates() {
        let df = df![
            "n" => [20240105i64, 20231231],
        ]
        .unwrap();

        let (out, cols) = standardize_dates(df.clone(), DateFormat::YearMonthDay, 0.0).unwrap();
        assert!(cols.is_empty());
        assert!(out.equals(&df));
    }

    #[test]
    fn test_text_without_dates_untouched() {
        let df = df![
            "name" => ["Alice", "Bob"],
        ]
        .unwrap();

        let (out, cols) = standardize_dates(df.clone(), DateFormat::YearMonthDay, 0.0).unwrap();
        assert!(cols.is_empty());
        assert!(out.equals(&df));
    }

    #[test]
    fn test_ratio_threshold_skips_mostly_text() {
        let df = df![
            "notes" => ["2024-01-05", "hello", "world", "again"],
        ]
        .unwrap();

        let (_, cols) = standardize_dates(df.clone(), DateFormat::YearMonthDay, 0.5).unwrap();
        assert!(cols.is_empty());

        let (_, cols) = standardize_dates(df, DateFormat::YearMonthDay, 0.0).unwrap();
        assert_eq!(cols, vec!["notes"]);
    }

    #[test]
    fn test_temporal_column_becomes_text() {
        let series = Series::new("d".into(), &[Some(0i32), None])
            .cast(&DataType::Date)
            .unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();

        let (df, cols) = standardize_dates(df, DateFormat::MonthDayYear, 0.0).unwrap();
        assert_eq!(cols, vec!["d"]);
        let col = df.column("d").unwrap().as_materialized_series();
        assert_eq!(col.dtype(), &DataType::String);
        assert_eq!(col.str().unwrap().get(0), Some("01-01-1970"));
    }
}
