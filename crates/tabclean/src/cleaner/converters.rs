//! Type conversion of a single column.

use polars::prelude::*;
use tracing::debug;

use crate::error::{Result, TableError};
use crate::types::{ColumnKind, TargetType};
use crate::utils::{is_datetime_dtype, numeric_values, parse_datetime_str, string_values};

const NANOS: DataType = DataType::Datetime(TimeUnit::Nanoseconds, None);

/// Convert `column` to `target`, returning a new table.
///
/// The input is never modified, so a failed conversion leaves the caller's
/// table as it was.
pub(crate) fn convert_column(df: &DataFrame, column: &str, target: TargetType) -> Result<DataFrame> {
    let series = df
        .column(column)
        .map_err(|_| TableError::ColumnNotFound(column.to_string()))?
        .as_materialized_series();

    let kind = ColumnKind::of_series(series);
    if !kind.allowed_targets().contains(&target) {
        return Err(TableError::ConversionNotAllowed {
            column: column.to_string(),
            from: kind.to_string(),
            to: target.to_string(),
        });
    }

    let converted = match target {
        TargetType::Int => to_int(series)?,
        TargetType::Float => to_float(series)?,
        TargetType::Datetime => to_datetime(series)?,
        TargetType::Text => to_text(series)?,
    };

    let coerced = converted.null_count().saturating_sub(series.null_count());
    if coerced > 0 {
        debug!(
            "Column '{}': {} values could not be converted and are now missing",
            column, coerced
        );
    }

    let mut out = df.clone();
    out.replace(column, converted)?;
    Ok(out)
}

/// Narrow to `Int64`. Datetimes become nanoseconds since the Unix epoch.
fn to_int(series: &Series) -> Result<Series> {
    if is_datetime_dtype(series.dtype()) {
        return Ok(series.cast(&NANOS)?.cast(&DataType::Int64)?);
    }

    let name = series.name().clone();
    let mut result_vec: Vec<Option<i64>> = Vec::with_capacity(series.len());

    for (row, opt_val) in numeric_values(series)?.into_iter().enumerate() {
        match opt_val {
            None => result_vec.push(None),
            Some(v) if v.is_nan() => result_vec.push(None),
            Some(v) if v.fract() != 0.0 || v < i64::MIN as f64 || v >= i64::MAX as f64 => {
                return Err(TableError::conversion(
                    name.as_str(),
                    TargetType::Int.label(),
                    format!("value {v} at row {row} is not representable as an integer"),
                ));
            }
            Some(v) => result_vec.push(Some(v as i64)),
        }
    }

    Ok(Series::new(name, result_vec))
}

fn to_float(series: &Series) -> Result<Series> {
    Ok(Series::new(series.name().clone(), numeric_values(series)?))
}

/// Convert to `Datetime(ns)`. Text is parsed, integers are nanoseconds since
/// the Unix epoch and floats are truncated first.
fn to_datetime(series: &Series) -> Result<Series> {
    let name = series.name().clone();

    let nanos: Vec<Option<i64>> = match ColumnKind::of_series(series) {
        ColumnKind::Datetime => return Ok(series.cast(&NANOS)?),
        ColumnKind::Integer => {
            return Ok(series.cast(&DataType::Int64)?.cast(&NANOS)?);
        }
        ColumnKind::Text => series
            .str()?
            .into_iter()
            .map(|opt| {
                opt.and_then(|v| parse_datetime_str(v, None))
                    .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
            })
            .collect(),
        _ => numeric_values(series)?
            .into_iter()
            .map(|opt| {
                opt.filter(|v| v.is_finite() && *v >= i64::MIN as f64 && *v < i64::MAX as f64)
                    .map(|v| v.trunc() as i64)
            })
            .collect(),
    };

    Ok(Series::new(name, nanos).cast(&NANOS)?)
}

/// Stringify every value; missing values become the empty string.
fn to_text(series: &Series) -> Result<Series> {
    let values: Vec<String> = string_values(series)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    Ok(Series::new(series.name().clone(), values))
}
