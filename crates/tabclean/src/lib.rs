//! Tabular Dataset Cleaning Library
//!
//! Upload a CSV or XLSX dataset, clean it with a configurable set of
//! toggles, filter and inspect it, then export it again. Built on Polars.
//!
//! # Overview
//!
//! - **Cleaning**: date standardization, duplicate removal, missing-value
//!   fill, column name standardization, text normalization with an
//!   email-aware second pass
//! - **Conversion**: per-column type conversion with a fixed table of
//!   allowed targets
//! - **Filtering**: value, range, date-range and substring filters that
//!   never mutate the held table
//! - **Session**: pristine upload plus held table, with copy-on-write
//!   commits and a reset
//! - **Charts**: column eligibility per chart kind and a correlation matrix
//! - **I/O**: CSV/XLSX upload and export
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabclean::{CleaningConfig, CaseTransform, DateFormat, FilterSpec, Session, SourceInfo};
//! use std::path::Path;
//!
//! let df = tabclean::io::load_path(Path::new("people.csv"))?;
//! let mut session = Session::new();
//! let source = SourceInfo::describe("people.csv", 0, &df);
//! session.load(df, source);
//!
//! let config = CleaningConfig::builder()
//!     .remove_duplicates(true)
//!     .case(CaseTransform::Title)
//!     .date_format(DateFormat::DayMonthYear)
//!     .build()?;
//! let report = session.clean(&config)?;
//! for message in &report.messages {
//!     println!("{message}");
//! }
//!
//! let view = session.filtered_view(&FilterSpec::Contains {
//!     column: "city".into(),
//!     term: "par".into(),
//! })?;
//! let bytes = tabclean::io::to_csv_bytes(&view)?;
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TableError>`](error::TableError).
//! Errors carry a stable [`error_code`](TableError::error_code) and serialize
//! as `{ code, message }`.

pub mod charts;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use charts::{ChartKind, ChartRequest, ColumnRole, CorrelationMatrix};
pub use cleaner::{TableCleaner, standardize_name};
pub use config::{CaseTransform, CleaningConfig, CleaningConfigBuilder, ConfigValidationError, DateFormat};
pub use error::{Result, ResultExt, TableError};
pub use filter::{FilterControl, FilterSpec, derive_filtered_view, distinct_values, filter_control};
pub use session::{PREVIEW_ROW_CHOICES, Session, SourceInfo};
pub use types::{CleaningReport, ColumnInfo, ColumnKind, TargetType};
