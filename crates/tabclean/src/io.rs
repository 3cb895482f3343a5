//! Upload and export.
//!
//! Uploads arrive as raw bytes (or a path) in CSV or XLSX form; exports
//! produce the bytes of `cleaned_dataset.csv` or `cleaned_data.xlsx`.

use calamine::{Data, DataType as _, Reader, Xlsx};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, ResultExt, TableError};
use crate::types::ColumnKind;
use crate::utils::{numeric_values, string_values};

/// File name offered for the CSV download.
pub const CSV_EXPORT_NAME: &str = "cleaned_dataset.csv";

/// File name offered for the XLSX download.
pub const XLSX_EXPORT_NAME: &str = "cleaned_data.xlsx";

/// Sheet name used in XLSX exports.
pub const XLSX_SHEET_NAME: &str = "Cleaned Data";

/// Rows scanned for CSV schema inference.
const INFER_SCHEMA_ROWS: usize = 1000;

/// Upload formats we read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Pick the format from a file name's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(TableError::UnsupportedFormat(ext)),
        }
    }
}

// =============================================================================
// Upload
// =============================================================================

/// Parse CSV bytes with a header row. Empty cells become missing.
pub fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| TableError::UploadFailed(e.to_string()))
}

/// Parse the first sheet of an XLSX workbook. The first row is the header.
pub fn read_xlsx_bytes(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| TableError::UploadFailed(format!("Excel: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableError::UploadFailed("Excel: workbook has no sheets".to_string()))?
        .map_err(|e| TableError::UploadFailed(format!("Excel: {e}")))?;

    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };

    let mut columns = Vec::with_capacity(header.len());
    for (col_idx, cell) in header.iter().enumerate() {
        let name = match cell.as_string() {
            Some(name) if !name.trim().is_empty() => name,
            _ => format!("column_{}", col_idx + 1),
        };
        let cells: Vec<Option<&Data>> = body
            .iter()
            .map(|row| row.get(col_idx).filter(|c| !c.is_empty()))
            .collect();
        columns.push(cells_to_series(&name, &cells).into());
    }

    let df = DataFrame::new(columns).map_err(|e| TableError::UploadFailed(e.to_string()))?;
    debug!("Read {} rows x {} columns from sheet", df.height(), df.width());
    Ok(df)
}

/// Build a series from one column of cells.
///
/// All-integral numbers become `Int64`, other numbers `Float64`, all
/// booleans `Boolean`, all datetimes `Datetime(ms)`; anything mixed is text.
fn cells_to_series(name: &str, cells: &[Option<&Data>]) -> Series {
    let present: Vec<&Data> = cells.iter().flatten().copied().collect();

    let all_numbers = !present.is_empty() && present.iter().all(|c| c.is_int() || c.is_float());
    if all_numbers {
        let all_whole = present
            .iter()
            .all(|c| c.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0));
        if all_whole {
            let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(|c| c.as_i64())).collect();
            return Series::new(name.into(), values);
        }
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|c| c.as_f64())).collect();
        return Series::new(name.into(), values);
    }

    if !present.is_empty() && present.iter().all(|c| c.is_bool()) {
        let values: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(|c| c.get_bool())).collect();
        return Series::new(name.into(), values);
    }

    if !present.is_empty() && present.iter().all(|c| c.is_datetime()) {
        let millis: Vec<Option<i64>> = cells
            .iter()
            .map(|c| {
                c.and_then(|c| c.as_datetime())
                    .map(|dt| dt.and_utc().timestamp_millis())
            })
            .collect();
        let series = Series::new(name.into(), millis);
        if let Ok(dated) = series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None)) {
            return dated;
        }
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| c.map(|c| c.as_string().unwrap_or_else(|| c.to_string())))
        .collect();
    Series::new(name.into(), values)
}

/// Read an upload by its extension (`csv` or `xlsx`).
pub fn load_path(path: &Path) -> Result<DataFrame> {
    let format = FileFormat::from_path(path)?;
    let bytes = std::fs::read(path).context(format!("Reading {}", path.display()))?;
    let df = match format {
        FileFormat::Csv => read_csv_bytes(&bytes),
        FileFormat::Xlsx => read_xlsx_bytes(&bytes),
    }
    .context(format!("Loading {}", path.display()))?;
    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

// =============================================================================
// Export
// =============================================================================

/// Serialize a table as UTF-8 CSV with a header row and no index.
pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut df = df.clone();
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .map_err(|e| TableError::ExportFailed(e.to_string()))?;
    Ok(buf)
}

/// Serialize a table as a single-sheet XLSX workbook.
///
/// Numbers are written as numbers and booleans as booleans; everything else
/// is written as text. Missing cells are left blank.
pub fn to_xlsx_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let export_err = |e: rust_xlsxwriter::XlsxError| TableError::ExportFailed(e.to_string());

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(XLSX_SHEET_NAME).map_err(export_err)?;

    for (col_idx, col) in df.get_columns().iter().enumerate() {
        let col_idx = u16::try_from(col_idx)
            .map_err(|_| TableError::ExportFailed("too many columns for a worksheet".to_string()))?;
        worksheet
            .write_string_with_format(0, col_idx, col.name().as_str(), &header_format)
            .map_err(export_err)?;

        let series = col.as_materialized_series();
        let cells = export_cells(series)?;
        for (row_idx, cell) in cells.into_iter().enumerate() {
            let row = u32::try_from(row_idx + 1)
                .map_err(|_| TableError::ExportFailed("too many rows for a worksheet".to_string()))?;
            match cell {
                ExportCell::Blank => {}
                ExportCell::Number(v) => {
                    worksheet.write_number(row, col_idx, v).map_err(export_err)?;
                }
                ExportCell::Bool(v) => {
                    worksheet.write_boolean(row, col_idx, v).map_err(export_err)?;
                }
                ExportCell::Text(v) => {
                    worksheet.write_string(row, col_idx, &v).map_err(export_err)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(export_err)
}

enum ExportCell {
    Blank,
    Number(f64),
    Bool(bool),
    Text(String),
}

fn export_cells(series: &Series) -> Result<Vec<ExportCell>> {
    let cells = match ColumnKind::of_series(series) {
        kind if kind.is_numeric() => numeric_values(series)?
            .into_iter()
            .map(|v| v.map_or(ExportCell::Blank, ExportCell::Number))
            .collect(),
        _ if series.dtype() == &DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(ExportCell::Blank, ExportCell::Bool))
            .collect(),
        _ => string_values(series)?
            .into_iter()
            .map(|v| v.map_or(ExportCell::Blank, ExportCell::Text))
            .collect(),
    };
    Ok(cells)
}
