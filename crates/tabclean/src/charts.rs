//! Chart selection and the data behind the correlation heatmap.
//!
//! Drawing is left to the front end; this module only decides which columns
//! a chart may use and computes the correlation matrix.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TableError};
use crate::types::ColumnKind;
use crate::utils::numeric_values;

/// Chart kinds offered on the review page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    Line,
    Bar,
    Histogram,
    Scatter,
    Box,
    Pie,
    CorrelationHeatmap,
}

/// What a chart needs from a selected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    Numeric,
    Categorical,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        Self::Line,
        Self::Bar,
        Self::Histogram,
        Self::Scatter,
        Self::Box,
        Self::Pie,
        Self::CorrelationHeatmap,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Line => "Line Chart",
            Self::Bar => "Bar Chart",
            Self::Histogram => "Histogram",
            Self::Scatter => "Scatter Plot",
            Self::Box => "Box Plot",
            Self::Pie => "Pie Chart",
            Self::CorrelationHeatmap => "Correlation Heatmap",
        }
    }

    /// Roles of the columns the user picks, in selection order.
    ///
    /// The heatmap takes no selection; it uses every numeric column.
    pub fn roles(&self) -> &'static [ColumnRole] {
        use ColumnRole::{Categorical, Numeric};
        match self {
            Self::Line | Self::Scatter => &[Numeric, Numeric],
            Self::Bar | Self::Box | Self::Pie => &[Categorical, Numeric],
            Self::Histogram => &[Numeric],
            Self::CorrelationHeatmap => &[],
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Integer and float columns, in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    columns_where(df, |kind| kind.is_numeric())
}

/// Text columns, in table order.
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    columns_where(df, |kind| kind == ColumnKind::Text)
}

fn columns_where(df: &DataFrame, pred: impl Fn(ColumnKind) -> bool) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| pred(ColumnKind::of_dtype(col.dtype())))
        .map(|col| col.name().to_string())
        .collect()
}

/// A chart and the columns picked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub columns: Vec<String>,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, columns: Vec<String>) -> Self {
        Self { kind, columns }
    }

    /// Check the picked columns against the chart's roles.
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        if self.kind == ChartKind::CorrelationHeatmap {
            let available = numeric_columns(df).len();
            if available < 2 {
                return Err(TableError::InvalidChart(format!(
                    "{} needs at least two numeric columns, found {}",
                    self.kind, available
                )));
            }
            return Ok(());
        }

        let roles = self.kind.roles();
        if self.columns.len() != roles.len() {
            return Err(TableError::InvalidChart(format!(
                "{} takes {} column(s), got {}",
                self.kind,
                roles.len(),
                self.columns.len()
            )));
        }

        for (name, role) in self.columns.iter().zip(roles) {
            let col = df
                .column(name)
                .map_err(|_| TableError::ColumnNotFound(name.clone()))?;
            let kind = ColumnKind::of_dtype(col.dtype());
            let fits = match role {
                ColumnRole::Numeric => kind.is_numeric(),
                ColumnRole::Categorical => kind == ColumnKind::Text,
            };
            if !fits {
                return Err(TableError::InvalidChart(format!(
                    "column '{}' is {}, {} needs a {:?} column",
                    name, kind, self.kind, role
                )));
            }
        }

        Ok(())
    }
}

/// Pairwise Pearson correlations between numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `columns.len()` squared; NaN where undefined.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Correlation matrix over every numeric column.
///
/// Each pair uses only the rows where both values are present.
pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix> {
    let columns = numeric_columns(df);
    let data: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|name| numeric_values(df.column(name)?.as_materialized_series()))
        .collect::<PolarsResult<_>>()?;

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&data[i], &data[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { columns, values })
}

/// Pearson correlation over complete pairs. NaN with fewer than two pairs
/// or zero variance.
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    let denominator = (sum_sq_x * sum_sq_y).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    numerator / denominator
}
