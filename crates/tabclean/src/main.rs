use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabclean::io::{self, CSV_EXPORT_NAME, XLSX_EXPORT_NAME};
use tabclean::{
    CaseTransform, CleaningConfig, CleaningReport, ColumnInfo, DateFormat, FilterControl,
    FilterSpec, PREVIEW_ROW_CHOICES, Session, SourceInfo, TargetType,
};
use tracing::{debug, info, warn};

/// CLI-compatible case transform enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCase {
    /// Leave letter case as-is
    NoChange,
    /// Title Case
    Title,
    /// UPPER CASE
    Upper,
    /// lower case
    Lower,
}

impl From<CliCase> for CaseTransform {
    fn from(cli: CliCase) -> Self {
        match cli {
            CliCase::NoChange => CaseTransform::NoChange,
            CliCase::Title => CaseTransform::Title,
            CliCase::Upper => CaseTransform::Upper,
            CliCase::Lower => CaseTransform::Lower,
        }
    }
}

/// CLI-compatible date output format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDateFormat {
    /// YYYY-MM-DD
    Ymd,
    /// DD-MM-YYYY
    Dmy,
    /// MM-DD-YYYY
    Mdy,
}

impl From<CliDateFormat> for DateFormat {
    fn from(cli: CliDateFormat) -> Self {
        match cli {
            CliDateFormat::Ymd => DateFormat::YearMonthDay,
            CliDateFormat::Dmy => DateFormat::DayMonthYear,
            CliDateFormat::Mdy => DateFormat::MonthDayYear,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Tabular dataset cleaning tool",
    long_about = "Clean, filter and export a CSV or XLSX dataset.\n\n\
                  EXAMPLES:\n  \
                  # Default text normalization, preview 10 rows\n  \
                  tabclean -i people.csv\n\n  \
                  # Dedupe, title-case text, reformat dates, export to out/\n  \
                  tabclean -i people.csv --remove-duplicates --case title --date-format dmy -o out/\n\n  \
                  # Keep rows aged 30-50 and drop a column\n  \
                  tabclean -i people.csv --filter-column age --min 30 --max 50 --drop notes\n\n  \
                  # Print the cleaning report as JSON\n  \
                  tabclean -i people.csv --config clean.json --json"
)]
struct Args {
    /// Path to the CSV or XLSX file to clean
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory; when set, cleaned_dataset.csv and cleaned_data.xlsx are written there
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with a cleaning configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remove rows that duplicate an earlier row
    #[arg(long)]
    remove_duplicates: bool,

    /// Replace missing cells with blanks
    #[arg(long)]
    fill_missing: bool,

    /// Trim and lowercase column names
    #[arg(long)]
    standardize_columns: bool,

    /// Keep ', _ and , in text values
    #[arg(long)]
    keep_special_characters: bool,

    /// Keep runs of whitespace inside text values
    #[arg(long)]
    keep_whitespace: bool,

    /// Case transform for text values
    #[arg(long, value_enum)]
    case: Option<CliCase>,

    /// Reformat date columns to this format
    #[arg(long, value_enum)]
    date_format: Option<CliDateFormat>,

    /// Minimum share of values that must parse as dates (0.0 - 1.0)
    #[arg(long)]
    date_match_ratio: Option<f64>,

    /// Column to filter on
    #[arg(long)]
    filter_column: Option<String>,

    /// Keep rows whose value is one of these (comma separated)
    #[arg(long, value_delimiter = ',', requires = "filter_column")]
    values: Vec<String>,

    /// Lower bound of a numeric range filter
    #[arg(long, requires = "filter_column")]
    min: Option<f64>,

    /// Upper bound of a numeric range filter
    #[arg(long, requires = "filter_column")]
    max: Option<f64>,

    /// First day of a date range filter (YYYY-MM-DD)
    #[arg(long, requires = "filter_column")]
    from: Option<NaiveDate>,

    /// Last day of a date range filter (YYYY-MM-DD)
    #[arg(long, requires = "filter_column")]
    to: Option<NaiveDate>,

    /// Keep rows containing this text (case-insensitive)
    #[arg(long, requires = "filter_column")]
    search: Option<String>,

    /// Convert a column, as COLUMN=TYPE (int, float, datetime, text); repeatable
    #[arg(long, value_name = "COLUMN=TYPE")]
    convert: Vec<String>,

    /// Delete a column from the filtered view; repeatable
    #[arg(long, value_name = "COLUMN")]
    drop: Vec<String>,

    /// Rows to preview (5, 10, 15, 20, 50, 100, 500, 1000)
    #[arg(long, default_value = "10", value_parser = parse_preview_rows)]
    preview: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON summary is printed.
    #[arg(long)]
    json: bool,
}

fn parse_preview_rows(s: &str) -> std::result::Result<usize, String> {
    let rows: usize = s.parse().map_err(|e| format!("{e}"))?;
    if PREVIEW_ROW_CHOICES.contains(&rows) {
        Ok(rows)
    } else {
        Err(format!("must be one of {PREVIEW_ROW_CHOICES:?}"))
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Summary printed with `--json`.
#[derive(Serialize)]
struct RunSummary<'a> {
    source: &'a SourceInfo,
    report: &'a CleaningReport,
    conversions: Vec<String>,
    ignored_columns: Vec<String>,
    filter: &'a FilterSpec,
    view_rows: usize,
    columns: Vec<ColumnInfo>,
    exported: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input.display());
    let df = io::load_path(&args.input)?;
    let size_bytes = std::fs::metadata(&args.input)?.len();
    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut session = Session::new();
    let source = SourceInfo::describe(name, size_bytes, &df);
    session.load(df, source);

    let report = session.clean(&config)?;

    let conversions = apply_conversions(&mut session, &args.convert)?;

    let spec = build_filter(&session, &args)?;
    debug!("Active filter: {:?}", spec);

    let ignored_columns = if args.drop.is_empty() {
        Vec::new()
    } else {
        let ignored = session.delete_columns(&args.drop, &spec)?;
        info!("Deleted columns; held table now {:?}", session.held()?.shape());
        ignored
    };

    // deletion already committed the filtered view
    let view = if args.drop.is_empty() {
        session.filtered_view(&spec)?
    } else {
        session.held()?.clone()
    };

    let exported = match &args.output {
        Some(dir) => export(session.held()?, dir)?,
        None => Vec::new(),
    };

    if args.json {
        let summary = RunSummary {
            source: session.source()?,
            report: &report,
            conversions,
            ignored_columns,
            filter: &spec,
            view_rows: view.height(),
            columns: session.columns()?,
            exported,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for message in &report.messages {
        println!("{message}");
    }
    for message in &conversions {
        println!("{message}");
    }
    if !ignored_columns.is_empty() {
        println!("Ignored unknown columns: {}", ignored_columns.join(", "));
    }
    println!();
    println!(
        "Showing {} of {} rows",
        view.height().min(args.preview),
        view.height()
    );
    println!("{}", view.head(Some(args.preview)));
    for path in &exported {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Load the JSON config (if any) and apply the flag overrides.
fn build_config(args: &Args) -> Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            CleaningConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => CleaningConfig::default(),
    };

    if args.remove_duplicates {
        config.remove_duplicates = true;
    }
    if args.fill_missing {
        config.fill_missing = true;
    }
    if args.standardize_columns {
        config.standardize_column_names = true;
    }
    if args.keep_special_characters {
        config.remove_special_characters = false;
    }
    if args.keep_whitespace {
        config.collapse_whitespace = false;
    }
    if let Some(case) = args.case {
        config.case = case.into();
    }
    if let Some(format) = args.date_format {
        config.date_format = Some(format.into());
    }
    if let Some(ratio) = args.date_match_ratio {
        config.date_match_ratio = ratio;
    }

    config.validate()?;
    Ok(config)
}

/// Apply each `COLUMN=TYPE` conversion in order.
///
/// Recoverable failures are reported and skipped; the held table keeps its
/// previous state for that column.
fn apply_conversions(session: &mut Session, requests: &[String]) -> Result<Vec<String>> {
    let mut messages = Vec::with_capacity(requests.len());
    for request in requests {
        let (column, target) = request
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid --convert '{}', expected COLUMN=TYPE", request))?;
        let target: TargetType = target.parse()?;

        match session.convert(column.trim(), target) {
            Ok(message) => messages.push(message),
            Err(e) if e.is_recoverable() => {
                warn!("{}", e);
                messages.push(e.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(messages)
}

/// Build the active filter from the filter flags.
///
/// A range or date range with one bound open takes the other bound from the
/// column's observed values.
fn build_filter(session: &Session, args: &Args) -> Result<FilterSpec> {
    let Some(column) = args.filter_column.clone() else {
        return Ok(FilterSpec::All);
    };

    let kinds = [
        !args.values.is_empty(),
        args.min.is_some() || args.max.is_some(),
        args.from.is_some() || args.to.is_some(),
        args.search.is_some(),
    ];
    if kinds.iter().filter(|k| **k).count() > 1 {
        return Err(anyhow!(
            "Use only one of --values, --min/--max, --from/--to or --search"
        ));
    }

    if !args.values.is_empty() {
        return Ok(FilterSpec::Values {
            column,
            values: args.values.clone(),
        });
    }
    if let Some(term) = &args.search {
        return Ok(FilterSpec::Contains {
            column,
            term: term.clone(),
        });
    }

    let control = session.filter_control(&column)?;
    match control {
        FilterControl::Range { min, max } if kinds[1] => Ok(FilterSpec::Range {
            column,
            min: args.min.unwrap_or(min),
            max: args.max.unwrap_or(max),
        }),
        FilterControl::DateRange { start, end } if kinds[2] => Ok(FilterSpec::DateRange {
            column,
            start: args.from.unwrap_or(start),
            end: args.to.unwrap_or(end),
        }),
        _ if kinds[1] => Ok(FilterSpec::Range {
            column,
            min: args.min.unwrap_or(f64::NEG_INFINITY),
            max: args.max.unwrap_or(f64::INFINITY),
        }),
        _ if kinds[2] => Ok(FilterSpec::DateRange {
            column,
            start: args.from.unwrap_or(NaiveDate::MIN),
            end: args.to.unwrap_or(NaiveDate::MAX),
        }),
        other => Ok(other.initial_spec(&column)),
    }
}

/// Write both export files into `dir`.
fn export(df: &polars::prelude::DataFrame, dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        info!("Created output directory: {}", dir.display());
    }

    let csv_path = dir.join(CSV_EXPORT_NAME);
    std::fs::write(&csv_path, io::to_csv_bytes(df)?)?;
    info!("Dataset saved: {}", csv_path.display());

    let xlsx_path = dir.join(XLSX_EXPORT_NAME);
    std::fs::write(&xlsx_path, io::to_xlsx_bytes(df)?)?;
    info!("Dataset saved: {}", xlsx_path.display());

    Ok(vec![csv_path, xlsx_path])
}
