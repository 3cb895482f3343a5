//! Error types for the table cleaning engine.
//!
//! Every fallible operation in the crate returns [`TableError`]. Errors are
//! serializable as `{ code, message }` so a front end can decide how to
//! surface them (a warning banner for a missing upload, an inline message for
//! a failed conversion, and so on).

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for table operations.
#[derive(Error, Debug)]
pub enum TableError {
    /// An operation was requested before any dataset was uploaded.
    #[error("Please upload a dataset first")]
    NoDataLoaded,

    /// Column was not found in the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// An operation that needs a selection was called with none.
    #[error("Please select at least one {0}")]
    EmptySelection(&'static str),

    /// The requested conversion is not offered for the column's current type.
    #[error("Cannot convert column '{column}' from {from} to {to}")]
    ConversionNotAllowed {
        column: String,
        from: String,
        to: String,
    },

    /// Type conversion failed.
    #[error("Conversion failed for column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// The filter does not fit the selected column.
    #[error("Invalid filter on column '{column}': {reason}")]
    InvalidFilter { column: String, reason: String },

    /// The chart request does not fit the table.
    #[error("Invalid chart: {0}")]
    InvalidChart(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cleaning step could not be applied.
    #[error("Failed to clean data: {0}")]
    CleaningFailed(String),

    /// The uploaded file could not be parsed into a table.
    #[error("Failed to read uploaded file: {0}")]
    UploadFailed(String),

    /// The uploaded file has an extension we do not read.
    #[error("Unsupported file format: '{0}' (expected csv or xlsx)")]
    UnsupportedFormat(String),

    /// Serializing the table for download failed.
    #[error("Failed to export data: {0}")]
    ExportFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TableError>,
    },
}

impl TableError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TableError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::EmptySelection(_) => "EMPTY_SELECTION",
            Self::ConversionNotAllowed { .. } => "CONVERSION_NOT_ALLOWED",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::InvalidFilter { .. } => "INVALID_FILTER",
            Self::InvalidChart(_) => "INVALID_CHART",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::UploadFailed(_) => "UPLOAD_FAILED",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::ExportFailed(_) => "EXPORT_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the held table is guaranteed untouched and the user can simply
    /// adjust their input and retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NoDataLoaded
            | Self::ColumnNotFound(_)
            | Self::EmptySelection(_)
            | Self::ConversionNotAllowed { .. }
            | Self::TypeConversionFailed { .. }
            | Self::InvalidFilter { .. }
            | Self::InvalidChart(_)
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Convenience constructor for conversion failures.
    pub(crate) fn conversion(
        column: impl Into<String>,
        target_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeConversionFailed {
            column: column.into(),
            target_type: target_type.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for filter mismatches.
    pub(crate) fn invalid_filter(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for TableError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TableError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TableError::Io(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TableError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(TableError::NoDataLoaded.error_code(), "NO_DATA_LOADED");
        assert_eq!(
            TableError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            TableError::EmptySelection("column").error_code(),
            "EMPTY_SELECTION"
        );
    }

    #[test]
    fn test_no_data_message_matches_warning() {
        assert_eq!(
            TableError::NoDataLoaded.to_string(),
            "Please upload a dataset first"
        );
        assert_eq!(
            TableError::EmptySelection("column").to_string(),
            "Please select at least one column"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(TableError::NoDataLoaded.is_recoverable());
        assert!(TableError::conversion("age", "int", "bad value").is_recoverable());
        assert!(!TableError::CleaningFailed("error".to_string()).is_recoverable());
        assert!(!TableError::ExportFailed("disk".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = TableError::ColumnNotFound("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = TableError::ColumnNotFound("test".to_string()).with_context("During filtering");
        assert!(error.to_string().contains("During filtering"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
        assert!(error.is_recoverable());
    }
}
