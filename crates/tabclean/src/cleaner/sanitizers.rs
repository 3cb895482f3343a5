//! Text normalization and the email-aware re-cleaning pass.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::utils::head_samples;

/// Runs of whitespace.
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace run"));

/// Characters removed by the special-character toggle.
static SPECIAL_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"['_,]").expect("Invalid regex: special characters"));

/// A whole value that looks like an email address.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("Invalid regex: email pattern")
});

/// Characters outside the email-safe set.
static NON_EMAIL_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9@._\- ]").expect("Invalid regex: email-safe set"));

/// Number of leading non-missing values inspected for email detection.
const EMAIL_SAMPLE_SIZE: usize = 10;

/// Names of the text columns of a table, in order.
pub(crate) fn text_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype() == &DataType::String)
        .map(|col| col.name().to_string())
        .collect()
}

/// Rewrite every non-missing value of a text column with `f`.
fn map_text_column<F>(df: &mut DataFrame, col_name: &str, f: F) -> Result<()>
where
    F: Fn(&str) -> String,
{
    let series = df.column(col_name)?.as_materialized_series();
    let cleaned_values: Vec<Option<String>> =
        series.str()?.into_iter().map(|opt| opt.map(&f)).collect();

    let cleaned_series = Series::new(col_name.into(), cleaned_values);
    df.replace(col_name, cleaned_series)?;
    Ok(())
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value, " ").into_owned()
}

/// Normalize a single text value according to the configuration.
pub(crate) fn normalize_text(value: &str, config: &CleaningConfig) -> String {
    let mut cleaned = value.trim().to_string();
    if config.collapse_whitespace {
        cleaned = collapse_whitespace(&cleaned);
    }
    if config.remove_special_characters {
        cleaned = SPECIAL_CHARACTERS.replace_all(&cleaned, "").into_owned();
    }
    config.case.apply(&cleaned)
}

/// Normalize every text column. Missing cells stay missing.
pub(crate) fn normalize_text_columns(df: &mut DataFrame, config: &CleaningConfig) -> Result<usize> {
    let text_columns = text_column_names(df);
    for col_name in &text_columns {
        map_text_column(df, col_name, |v| normalize_text(v, config))?;
    }
    debug!("Normalized {} text columns", text_columns.len());
    Ok(text_columns.len())
}

/// Whether any of the first few non-missing values is an email address.
pub(crate) fn is_email_like(series: &Series) -> Result<bool> {
    Ok(head_samples(series, EMAIL_SAMPLE_SIZE)?
        .iter()
        .any(|v| EMAIL_PATTERN.is_match(v)))
}

/// Trim, collapse whitespace and drop characters outside the email-safe set.
pub(crate) fn clean_email(value: &str) -> String {
    let collapsed = collapse_whitespace(value.trim());
    NON_EMAIL_CHARACTERS.replace_all(&collapsed, "").into_owned()
}

/// Trim and collapse whitespace.
pub(crate) fn clean_generic(value: &str) -> String {
    collapse_whitespace(value.trim())
}

/// Re-clean every text column with the email rule or the generic rule.
///
/// Returns the names of the columns classified as email-like.
pub(crate) fn reclean_text_columns(df: &mut DataFrame) -> Result<Vec<String>> {
    let mut email_columns = Vec::new();

    for col_name in &text_column_names(df) {
        let series = df.column(col_name)?.as_materialized_series();
        if is_email_like(series)? {
            debug!("Column '{}' looks like email addresses", col_name);
            map_text_column(df, col_name, clean_email)?;
            email_columns.push(col_name.clone());
        } else {
            map_text_column(df, col_name, clean_generic)?;
        }
    }

    Ok(email_columns)
}
