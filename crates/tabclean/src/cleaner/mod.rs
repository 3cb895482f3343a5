//! The table cleaning pipeline.
//!
//! This module provides functionality for:
//! - Standardizing date columns to one output format
//! - Removing duplicate rows
//! - Filling missing cells
//! - Standardizing column names
//! - Normalizing text values, with an email-aware second pass
//! - Converting a column's type and deleting columns

mod columns;
mod converters;
mod dates;
mod sanitizers;

pub use columns::standardize_name;

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::types::{CleaningReport, TargetType};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Applies cleaning configurations, conversions and deletions to tables.
///
/// Every method takes its input by value or by reference and returns a new
/// table; nothing is mutated in place from the caller's point of view.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCleaner;

impl TableCleaner {
    /// Apply a cleaning configuration.
    ///
    /// Steps run in a fixed order, each observing the previous ones:
    /// 1. Date standardization (when a date format is configured)
    /// 2. Duplicate row removal
    /// 3. Missing-value fill
    /// 4. Column name standardization
    /// 5. Text normalization
    /// 6. Email-aware re-normalization of text columns
    ///
    /// Duplicate removal runs before text normalization, so rows that only
    /// become identical once normalized are collapsed on the next run.
    pub fn clean(&self, df: DataFrame, config: &CleaningConfig) -> Result<(DataFrame, CleaningReport)> {
        config.validate()?;

        let mut df = df;
        let mut report = CleaningReport {
            rows_before: df.height(),
            ..Default::default()
        };

        info!("Applying cleaning configuration...");

        // 1. Dates
        if let Some(format) = config.date_format {
            let (dated, date_columns) = dates::standardize_dates(df, format, config.date_match_ratio)?;
            df = dated;
            if date_columns.is_empty() {
                report.push("No date columns detected");
            } else {
                report.push(format!(
                    "Formatted {} date column(s) as {}",
                    date_columns.len(),
                    format
                ));
            }
            info!("Date standardization: {} column(s)", date_columns.len());
            report.date_columns = date_columns;
        }

        // 2. Duplicates
        if config.remove_duplicates {
            let (deduped, removed) = columns::remove_duplicates(&df)?;
            df = deduped;
            report.duplicates_removed = removed;
            report.push(format!("Removed {} duplicate rows", removed));
            info!("Removed {} duplicate rows", removed);
        }

        // 3. Missing values
        if config.fill_missing {
            let filled = columns::fill_missing(&mut df)?;
            report.push("Missing values replaced with blanks");
            info!("Filled {} missing cells", filled);
        }

        // 4. Column names
        if config.standardize_column_names {
            let renamed = columns::standardize_column_names(&mut df)?;
            report.push("Column names standardized");
            info!("Standardized column names ({} changed)", renamed.len());
            report.renamed_columns = renamed;
        }

        // 5. Text
        let text_columns = sanitizers::normalize_text_columns(&mut df, config)?;
        debug!("Text normalization applied to {} columns", text_columns);

        // 6. Email-aware pass
        let email_columns = sanitizers::reclean_text_columns(&mut df)?;
        if !email_columns.is_empty() {
            info!("Email columns detected: {:?}", email_columns);
        }
        report.email_columns = email_columns;

        report.rows_after = df.height();
        report.push("Dataset cleaned and ready for analysis");
        info!(
            "Cleaning complete: {} -> {} rows",
            report.rows_before, report.rows_after
        );

        Ok((df, report))
    }

    /// Convert one column to another type.
    ///
    /// Returns the converted table and a confirmation message naming the new
    /// dtype.
    pub fn convert(&self, df: &DataFrame, column: &str, target: TargetType) -> Result<(DataFrame, String)> {
        let out = converters::convert_column(df, column, target)?;
        let dtype = out.column(column)?.dtype().clone();
        info!("Converted column '{}' to {} ({})", column, target, dtype);
        Ok((out, format!("Converted {} to {} (dtype: {})", column, target, dtype)))
    }

    /// Delete columns by name.
    ///
    /// Returns the new table and the names that were not present.
    pub fn delete_columns(&self, df: &DataFrame, names: &[String]) -> Result<(DataFrame, Vec<String>)> {
        let (out, ignored) = columns::delete_columns(df, names)?;
        let deleted = df.width() - out.width();
        if deleted == 0 {
            warn!("No columns deleted; none of {:?} exist", names);
        } else {
            info!("Deleted {} column(s)", deleted);
        }
        Ok((out, ignored))
    }
}
