use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TableError;
use crate::utils::{DtypeCategory, get_dtype_category};

/// Semantic type of a column, derived from its current dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Datetime,
    /// Boolean and anything else the pipeline has no rules for.
    Other,
}

impl ColumnKind {
    /// Classify a dtype.
    pub fn of_dtype(dtype: &DataType) -> Self {
        match get_dtype_category(dtype) {
            DtypeCategory::Numeric if dtype.is_float() => Self::Float,
            DtypeCategory::Numeric => Self::Integer,
            DtypeCategory::Datetime => Self::Datetime,
            DtypeCategory::String => Self::Text,
            DtypeCategory::Boolean | DtypeCategory::Other => Self::Other,
        }
    }

    /// Classify a series.
    pub fn of_series(series: &Series) -> Self {
        Self::of_dtype(series.dtype())
    }

    /// Whether the column holds integers or floats.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Conversions offered for a column of this kind.
    pub fn allowed_targets(&self) -> &'static [TargetType] {
        match self {
            Self::Integer => &[TargetType::Float, TargetType::Datetime],
            Self::Float => &[TargetType::Int, TargetType::Datetime],
            Self::Text => &[TargetType::Int, TargetType::Datetime],
            Self::Datetime => &[TargetType::Int, TargetType::Text],
            Self::Other => &[],
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Datetime => "datetime",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Target of a type conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    Int,
    Float,
    Datetime,
    Text,
}

impl TargetType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Datetime => "datetime",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TargetType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" | "int64" => Ok(Self::Int),
            "float" | "float64" => Ok(Self::Float),
            "datetime" | "date" => Ok(Self::Datetime),
            "text" | "object" | "str" | "string" => Ok(Self::Text),
            other => Err(TableError::InvalidConfig(format!(
                "unknown conversion target '{other}' (expected int, float, datetime or text)"
            ))),
        }
    }
}

/// Column metadata handed to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
    pub null_count: usize,
}

impl ColumnInfo {
    /// Describe every column of a table, in order.
    pub fn describe(df: &DataFrame) -> Vec<ColumnInfo> {
        df.get_columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                dtype: format!("{}", col.dtype()),
                kind: ColumnKind::of_dtype(col.dtype()),
                null_count: col.null_count(),
            })
            .collect()
    }
}

/// What a cleaning run did, for display next to the cleaned table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Human-readable confirmations, one per applied step, in step order.
    pub messages: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    /// `(old, new)` pairs for column names changed by standardization.
    pub renamed_columns: Vec<(String, String)>,
    /// Columns reformatted by date standardization.
    pub date_columns: Vec<String>,
    /// Text columns cleaned with the email-safe rule.
    pub email_columns: Vec<String>,
}

impl CleaningReport {
    pub(crate) fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}
