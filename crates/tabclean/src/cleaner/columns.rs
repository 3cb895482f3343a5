//! Row and column level operations: duplicate removal, missing-value fill,
//! column name standardization and column deletion.

use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::{Result, TableError};
use crate::utils::string_values;

/// Drop rows identical to an earlier row across all columns.
///
/// The first occurrence of each row is kept and row order is preserved.
/// Returns the deduplicated table and the number of rows removed.
pub(crate) fn remove_duplicates(df: &DataFrame) -> Result<(DataFrame, usize)> {
    let height = df.height();
    if height == 0 || df.width() == 0 {
        return Ok((df.clone(), 0));
    }

    let deduped = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let removed = height - deduped.height();
    debug!("Removed {} duplicate rows", removed);

    Ok((deduped, removed))
}

/// Replace every missing cell with an empty string.
///
/// Columns containing missing values become text columns; the rest keep
/// their dtype. Returns the number of cells filled.
pub(crate) fn fill_missing(df: &mut DataFrame) -> Result<usize> {
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut filled = 0;
    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series();
        let nulls = series.null_count();
        if nulls == 0 {
            continue;
        }

        let values: Vec<String> = string_values(series)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        df.replace(col_name, Series::new(col_name.as_str().into(), values))?;

        debug!("Filled {} missing values in column '{}'", nulls, col_name);
        filled += nulls;
    }

    Ok(filled)
}

/// Standardize one column name: trim, lowercase, then strip every literal
/// `" ,"`. Spaces are kept.
pub fn standardize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(" ,", "")
}

/// Standardize all column names in place.
///
/// Fails without touching the table when two columns would end up with the
/// same name. Returns `(old, new)` pairs for the names that changed.
pub(crate) fn standardize_column_names(df: &mut DataFrame) -> Result<Vec<(String, String)>> {
    let old_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut owners: HashMap<String, &str> = HashMap::with_capacity(old_names.len());
    let mut renames = Vec::new();

    for old in &old_names {
        let new = standardize_name(old);
        if let Some(previous) = owners.insert(new.clone(), old.as_str()) {
            return Err(TableError::CleaningFailed(format!(
                "columns '{previous}' and '{old}' both standardize to '{new}'"
            )));
        }
        if &new != old {
            renames.push((old.clone(), new));
        }
    }

    for (old, new) in &renames {
        df.rename(old, new.as_str().into())?;
        debug!("Renamed column '{}' -> '{}'", old, new);
    }

    Ok(renames)
}

/// Remove the named columns.
///
/// Names not present in the table are ignored, logged and returned.
pub(crate) fn delete_columns(df: &DataFrame, names: &[String]) -> Result<(DataFrame, Vec<String>)> {
    if names.is_empty() {
        return Err(TableError::EmptySelection("column"));
    }

    let present: HashSet<&str> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.as_str())
        .collect();

    let (to_drop, ignored): (Vec<&String>, Vec<&String>) =
        names.iter().partition(|name| present.contains(name.as_str()));

    if !ignored.is_empty() {
        warn!("Ignoring unknown columns in deletion: {:?}", ignored);
    }

    let cols_ref: Vec<PlSmallStr> = to_drop.iter().map(|s| s.as_str().into()).collect();
    let out = df.drop_many(cols_ref);

    Ok((out, ignored.into_iter().cloned().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        string_values(df.column(name).unwrap().as_materialized_series()).unwrap()
    }

    #[test]
    fn test_remove_duplicates_keeps_first_in_order() {
        let df = df![
            "name" => ["b", "a", "b", "c", "a"],
            "n" => [1i64, 2, 1, 3, 2],
        ]
        .unwrap();

        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            text(&out, "name"),
            vec![Some("b".into()), Some("a".into()), Some("c".into())]
        );
    }

    #[test]
    fn test_remove_duplicates_compares_whole_rows() {
        let df = df![
            "name" => ["a", "a"],
            "n" => [1i64, 2],
        ]
        .unwrap();

        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_remove_duplicates_missing_equal_missing() {
        let df = df![
            "v" => [None::<&str>, None, Some("x")],
        ]
        .unwrap();

        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_remove_duplicates_keeps_subsecond_datetimes() {
        // 100ms and 900ms past the same second
        let at = Series::new(
            "at".into(),
            &[
                1_704_448_800_100_000_000i64,
                1_704_448_800_900_000_000,
                1_704_448_800_100_000_000,
            ],
        )
        .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))
        .unwrap();
        let df = DataFrame::new(vec![at.into()]).unwrap();

        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 1);
        let stamps: Vec<Option<i64>> = out
            .column("at")
            .unwrap()
            .as_materialized_series()
            .to_physical_repr()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            stamps,
            vec![Some(1_704_448_800_100_000_000), Some(1_704_448_800_900_000_000)]
        );
    }

    #[test]
    fn test_remove_duplicates_empty_table() {
        let df = DataFrame::empty();
        let (out, removed) = remove_duplicates(&df).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn test_fill_missing_only_touches_columns_with_nulls() {
        let mut df = df![
            "age" => [Some(30i64), None],
            "score" => [1.5f64, 2.5],
        ]
        .unwrap();

        let filled = fill_missing(&mut df).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::String);
        assert_eq!(text(&df, "age"), vec![Some("30".into()), Some("".into())]);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_standardize_name() {
        assert_eq!(standardize_name("  First Name "), "first name");
        assert_eq!(standardize_name("City ,State"), "citystate");
        assert_eq!(standardize_name("AGE"), "age");
        assert_eq!(standardize_name("first_name"), "first_name");
    }

    #[test]
    fn test_standardize_name_idempotent() {
        for name in ["  First Name ", "City ,State", "Email", "a , ,b"] {
            let once = standardize_name(name);
            assert_eq!(standardize_name(&once), once);
        }
    }

    #[test]
    fn test_standardize_column_names_reports_renames() {
        let mut df = df![
            " Name " => ["a"],
            "age" => [1i64],
        ]
        .unwrap();

        let renames = standardize_column_names(&mut df).unwrap();
        assert_eq!(renames, vec![(" Name ".to_string(), "name".to_string())]);
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn test_standardize_column_names_collision() {
        let mut df = df![
            "Name" => ["a"],
            "name " => ["b"],
        ]
        .unwrap();

        let err = standardize_column_names(&mut df).unwrap_err();
        assert_eq!(err.error_code(), "CLEANING_FAILED");
        assert_eq!(df.get_column_names()[0].as_str(), "Name");
    }

    #[test]
    fn test_delete_columns_ignores_unknown() {
        let df = df![
            "a" => [1i64],
            "b" => [2i64],
        ]
        .unwrap();

        let (out, ignored) =
            delete_columns(&df, &["a".to_string(), "zzz".to_string()]).unwrap();
        assert_eq!(out.width(), 1);
        assert_eq!(out.get_column_names()[0].as_str(), "b");
        assert_eq!(ignored, vec!["zzz"]);
    }

    #[test]
    fn test_delete_columns_empty_selection() {
        let df = df!["a" => [1i64]].unwrap();
        let err = delete_columns(&df, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Please select at least one column");
    }
}
