//! Session state: the pristine upload and the held table.
//!
//! The held table is always the last successfully committed version. Every
//! mutating operation works on a clone and swaps it in only on success, so a
//! failed operation leaves the session exactly as it was.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::charts::{self, ChartRequest, CorrelationMatrix};
use crate::cleaner::TableCleaner;
use crate::config::CleaningConfig;
use crate::error::{Result, TableError};
use crate::filter::{self, FilterControl, FilterSpec};
use crate::types::{CleaningReport, ColumnInfo, TargetType};

/// Row counts offered by the preview dropdown.
pub const PREVIEW_ROW_CHOICES: [usize; 8] = [5, 10, 15, 20, 50, 100, 500, 1000];

/// Metadata about the uploaded file.
///
/// Computed once when loading, served from cache thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// File name as uploaded (e.g., "data.csv")
    pub name: String,
    pub size_bytes: u64,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnInfo>,
}

impl SourceInfo {
    pub fn describe(name: impl Into<String>, size_bytes: u64, df: &DataFrame) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            row_count: df.height(),
            column_count: df.width(),
            columns: ColumnInfo::describe(df),
        }
    }
}

/// An uploaded table and its working copy.
struct LoadedTable {
    /// The table as uploaded; restored by [`Session::reset`].
    raw: DataFrame,
    /// The current dataset state.
    held: DataFrame,
    source: SourceInfo,
}

/// One user's working session.
///
/// `None` until a dataset is uploaded; every operation before that fails
/// with [`TableError::NoDataLoaded`].
#[derive(Default)]
pub struct Session {
    table: Option<LoadedTable>,
    cleaner: TableCleaner,
}

static_assertions::assert_impl_all!(Session: Send);

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an upload as both the pristine copy and the held table,
    /// replacing anything loaded before.
    pub fn load(&mut self, df: DataFrame, source: SourceInfo) {
        info!(
            "Loaded '{}' ({} rows x {} columns)",
            source.name, source.row_count, source.column_count
        );
        self.table = Some(LoadedTable {
            raw: df.clone(),
            held: df,
            source,
        });
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    fn loaded(&self) -> Result<&LoadedTable> {
        self.table.as_ref().ok_or(TableError::NoDataLoaded)
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedTable> {
        self.table.as_mut().ok_or(TableError::NoDataLoaded)
    }

    /// The held table.
    pub fn held(&self) -> Result<&DataFrame> {
        Ok(&self.loaded()?.held)
    }

    /// The pristine upload.
    pub fn raw(&self) -> Result<&DataFrame> {
        Ok(&self.loaded()?.raw)
    }

    pub fn source(&self) -> Result<&SourceInfo> {
        Ok(&self.loaded()?.source)
    }

    /// Column metadata of the held table.
    pub fn columns(&self) -> Result<Vec<ColumnInfo>> {
        Ok(ColumnInfo::describe(self.held()?))
    }

    /// The first `rows` rows of the held table.
    pub fn preview(&self, rows: usize) -> Result<DataFrame> {
        if !PREVIEW_ROW_CHOICES.contains(&rows) {
            return Err(TableError::InvalidConfig(format!(
                "preview size {rows} is not one of {PREVIEW_ROW_CHOICES:?}"
            )));
        }
        Ok(self.held()?.head(Some(rows)))
    }

    /// Clean the held table and commit the result.
    pub fn clean(&mut self, config: &CleaningConfig) -> Result<CleaningReport> {
        let current = self.held()?.clone();
        let (cleaned, report) = self.cleaner.clean(current, config)?;
        self.loaded_mut()?.held = cleaned;
        Ok(report)
    }

    /// Convert a column of the held table and commit the result.
    pub fn convert(&mut self, column: &str, target: TargetType) -> Result<String> {
        let (converted, message) = self.cleaner.convert(self.held()?, column, target)?;
        self.loaded_mut()?.held = converted;
        Ok(message)
    }

    /// Derive a filtered view of the held table. The held table is untouched.
    pub fn filtered_view(&self, spec: &FilterSpec) -> Result<DataFrame> {
        filter::derive_filtered_view(self.held()?, spec)
    }

    pub fn filter_control(&self, column: &str) -> Result<FilterControl> {
        filter::filter_control(self.held()?, column)
    }

    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        filter::distinct_values(self.held()?, column)
    }

    /// Delete columns from the current filtered view and commit that as the
    /// new held table.
    ///
    /// Rows excluded by `spec` are dropped along with the columns. Returns
    /// the names that were not present.
    pub fn delete_columns(&mut self, names: &[String], spec: &FilterSpec) -> Result<Vec<String>> {
        let view = self.filtered_view(spec)?;
        let (remaining, ignored) = self.cleaner.delete_columns(&view, names)?;
        debug!(
            "Committing {} rows x {} columns after deletion",
            remaining.height(),
            remaining.width()
        );
        self.loaded_mut()?.held = remaining;
        Ok(ignored)
    }

    /// Restore the pristine upload as the held table.
    pub fn reset(&mut self) -> Result<()> {
        let table = self.loaded_mut()?;
        table.held = table.raw.clone();
        info!("Session reset to the uploaded dataset");
        Ok(())
    }

    /// Validate a chart request against the filtered view it would draw.
    pub fn check_chart(&self, request: &ChartRequest, spec: &FilterSpec) -> Result<()> {
        request.validate(&self.filtered_view(spec)?)
    }

    /// Correlation matrix of the filtered view.
    pub fn correlation(&self, spec: &FilterSpec) -> Result<CorrelationMatrix> {
        charts::correlation_matrix(&self.filtered_view(spec)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartKind;

    fn loaded_session() -> Session {
        let df = df![
            "name" => ["Ann", "Bob", "Cy"],
            "age" => [30i64, 45, 22],
            "score" => [1.0f64, 2.0, 3.0],
        ]
        .unwrap();
        let mut session = Session::new();
        let source = SourceInfo::describe("people.csv", 42, &df);
        session.load(df, source);
        session
    }

    #[test]
    fn test_operations_require_data() {
        let mut session = Session::new();
        assert!(!session.is_loaded());

        let errors = vec![
            session.held().map(|_| ()).unwrap_err(),
            session.preview(5).map(|_| ()).unwrap_err(),
            session.filtered_view(&FilterSpec::All).map(|_| ()).unwrap_err(),
            session.clean(&CleaningConfig::default()).map(|_| ()).unwrap_err(),
            session.convert("age", TargetType::Float).map(|_| ()).unwrap_err(),
            session
                .delete_columns(&["age".to_string()], &FilterSpec::All)
                .map(|_| ())
                .unwrap_err(),
            session.reset().unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.error_code(), "NO_DATA_LOADED");
            assert_eq!(err.to_string(), "Please upload a dataset first");
        }
    }

    #[test]
    fn test_source_info() {
        let session = loaded_session();
        let source = session.source().unwrap();
        assert_eq!(source.row_count, 3);
        assert_eq!(source.column_count, 3);
        assert_eq!(source.columns[1].name, "age");
    }

    #[test]
    fn test_preview_sizes() {
        let session = loaded_session();
        assert_eq!(session.preview(5).unwrap().height(), 3);
        assert_eq!(session.preview(7).unwrap_err().error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_failed_conversion_leaves_table_unchanged() {
        let df = df![
            "price" => [1.0f64, 2.5],
            "name" => ["a", "b"],
        ]
        .unwrap();
        let mut session = Session::new();
        let source = SourceInfo::describe("prices.csv", 10, &df);
        session.load(df.clone(), source);

        let err = session.convert("price", TargetType::Int).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
        let err = session.convert("name", TargetType::Text).unwrap_err();
        assert_eq!(err.error_code(), "CONVERSION_NOT_ALLOWED");

        assert!(session.held().unwrap().equals(&df));
    }

    #[test]
    fn test_conversion_commits() {
        let mut session = loaded_session();
        let message = session.convert("age", TargetType::Float).unwrap();
        assert!(message.contains("f64"));
        assert_eq!(
            session.held().unwrap().column("age").unwrap().dtype(),
            &DataType::Float64
        );
        assert_eq!(
            session.raw().unwrap().column("age").unwrap().dtype(),
            &DataType::Int64
        );
    }

    #[test]
    fn test_delete_commits_filtered_view() {
        let mut session = loaded_session();
        let spec = FilterSpec::Range {
            column: "age".into(),
            min: 25.0,
            max: 50.0,
        };

        let ignored = session
            .delete_columns(&["score".to_string(), "ghost".to_string()], &spec)
            .unwrap();
        assert_eq!(ignored, vec!["ghost"]);

        let held = session.held().unwrap();
        assert_eq!(held.shape(), (2, 2));
        assert_eq!(session.raw().unwrap().shape(), (3, 3));
    }

    #[test]
    fn test_filtered_view_does_not_commit() {
        let session = loaded_session();
        let spec = FilterSpec::Contains {
            column: "name".into(),
            term: "a".into(),
        };
        assert_eq!(session.filtered_view(&spec).unwrap().height(), 1);
        assert_eq!(session.held().unwrap().height(), 3);
    }

    #[test]
    fn test_reset_restores_upload() {
        let mut session = loaded_session();
        session
            .delete_columns(&["score".to_string()], &FilterSpec::All)
            .unwrap();
        assert_eq!(session.held().unwrap().width(), 2);

        session.reset().unwrap();
        assert_eq!(session.held().unwrap().width(), 3);
    }

    #[test]
    fn test_charts_use_filtered_view() {
        let session = loaded_session();
        let request = ChartRequest::new(ChartKind::Scatter, vec!["age".into(), "score".into()]);
        assert!(session.check_chart(&request, &FilterSpec::All).is_ok());

        let matrix = session.correlation(&FilterSpec::All).unwrap();
        assert_eq!(matrix.columns, vec!["age", "score"]);
    }
}
