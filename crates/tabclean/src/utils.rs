//! Shared utilities for the cleaning engine.
//!
//! Dtype classification, value stringification, and the lenient number and
//! date parsers used by date standardization, conversion and filtering.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for cleaning purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Check if a DataType is boolean.
#[inline]
pub fn is_boolean_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Boolean)
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if is_boolean_dtype(dtype) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Rendering used when a datetime value is turned into text. Sub-second
/// digits appear only when present.
pub const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Read a date or datetime series as naive datetimes.
///
/// Datetime columns keep their own time unit; dates are read as midnight.
pub fn temporal_values(series: &Series) -> PolarsResult<Vec<Option<NaiveDateTime>>> {
    let (physical, unit) = match series.dtype() {
        DataType::Datetime(unit, _) => (series.to_physical_repr().into_owned(), *unit),
        _ => (
            series
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .to_physical_repr()
                .into_owned(),
            TimeUnit::Milliseconds,
        ),
    };

    Ok(physical
        .i64()?
        .into_iter()
        .map(|opt| {
            opt.and_then(|v| match unit {
                TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(v)),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
            })
            .map(|dt| dt.naive_utc())
        })
        .collect())
}

/// Stringify every value of a series; missing values stay `None`.
///
/// Datetimes render as `YYYY-MM-DD HH:MM:SS[.fff]`, or `YYYY-MM-DD` for
/// `Date` columns. Everything else goes through polars' string cast.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    match series.dtype() {
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|opt| opt.map(str::to_string))
            .collect()),
        DataType::Date => Ok(temporal_values(series)?
            .into_iter()
            .map(|opt| opt.map(|dt| dt.date().format("%Y-%m-%d").to_string()))
            .collect()),
        DataType::Datetime(_, _) => Ok(temporal_values(series)?
            .into_iter()
            .map(|opt| opt.map(|dt| dt.format(DATETIME_TEXT_FORMAT).to_string()))
            .collect()),
        _ => {
            let cast = series.cast(&DataType::String)?;
            Ok(cast
                .str()?
                .into_iter()
                .map(|opt| opt.map(str::to_string))
                .collect())
        }
    }
}

/// Read a series as `f64` values. Text is parsed with [`parse_number`];
/// unparseable values become `None`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    if series.dtype() == &DataType::String {
        return Ok(series
            .str()?
            .into_iter()
            .map(|opt| opt.and_then(parse_number))
            .collect());
    }
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Collect up to `max_samples` non-missing values, in row order.
pub fn head_samples(series: &Series, max_samples: usize) -> PolarsResult<Vec<String>> {
    Ok(string_values(series)?
        .into_iter()
        .flatten()
        .take(max_samples)
        .collect())
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Parse a trimmed decimal number. No thousands separators or currency
/// symbols are accepted; empty text is `None`.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Datetime layouts tried after the preferred format.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts. Ambiguous day/month orders resolve month-first.
const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
];

/// Parse a date or datetime string.
///
/// `preferred` is a date-only chrono pattern tried before the built-in
/// layouts; date standardization passes its own output format here so that
/// already-standardized values parse back to the same day.
pub fn parse_datetime_str(s: &str, preferred: Option<&str>) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(pattern) = preferred
        && let Ok(d) = NaiveDate::parse_from_str(s, pattern)
    {
        return d.and_hms_opt(0, 0, 0);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

// =============================================================================
// Tests
// =============================================================================
