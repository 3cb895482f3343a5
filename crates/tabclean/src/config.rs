//! Configuration types for the cleaning pipeline.
//!
//! Each toggle corresponds to one control on the cleaning page. The builder
//! validates the only numeric knob, the date detection ratio.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Case transform applied as the last text normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CaseTransform {
    /// Leave letter case as-is
    #[default]
    NoChange,
    /// Upper-case the first letter of every word, lower-case the rest
    Title,
    /// UPPER CASE
    Upper,
    /// lower case
    Lower,
}

impl CaseTransform {
    /// Label shown in the case dropdown.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoChange => "No Change",
            Self::Title => "Title Case",
            Self::Upper => "UPPER CASE",
            Self::Lower => "lower case",
        }
    }

    /// Apply the transform to a single value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::NoChange => value.to_string(),
            Self::Title => title_case(value),
            Self::Upper => value.to_uppercase(),
            Self::Lower => value.to_lowercase(),
        }
    }
}

impl fmt::Display for CaseTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CaseTransform {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no change" | "none" | "no-change" | "keep" => Ok(Self::NoChange),
            "title case" | "title" => Ok(Self::Title),
            "upper case" | "upper" => Ok(Self::Upper),
            "lower case" | "lower" => Ok(Self::Lower),
            _ => Err(ConfigValidationError::UnknownOption {
                field: "case".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Title-case a value: a letter that follows a non-letter is upper-cased,
/// every other letter is lower-cased.
pub(crate) fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Output format for standardized date columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    #[default]
    YearMonthDay,
    /// `DD-MM-YYYY`
    DayMonthYear,
    /// `MM-DD-YYYY`
    MonthDayYear,
}

impl DateFormat {
    /// Label shown in the date format dropdown.
    pub fn label(&self) -> &'static str {
        match self {
            Self::YearMonthDay => "YYYY-MM-DD",
            Self::DayMonthYear => "DD-MM-YYYY",
            Self::MonthDayYear => "MM-DD-YYYY",
        }
    }

    /// The chrono format string for this output format.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::YearMonthDay => "%Y-%m-%d",
            Self::DayMonthYear => "%d-%m-%Y",
            Self::MonthDayYear => "%m-%d-%Y",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DateFormat {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "YYYY-MM-DD" | "ISO" => Ok(Self::YearMonthDay),
            "DD-MM-YYYY" => Ok(Self::DayMonthYear),
            "MM-DD-YYYY" => Ok(Self::MonthDayYear),
            _ => Err(ConfigValidationError::UnknownOption {
                field: "date_format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Configuration for [`crate::TableCleaner::clean`].
///
/// Use [`CleaningConfig::builder()`] for a validated configuration, or
/// deserialize one from JSON. Missing JSON fields take their defaults.
///
/// # Example
///
/// ```rust,ignore
/// use tabclean::config::{CleaningConfig, CaseTransform, DateFormat};
///
/// let config = CleaningConfig::builder()
///     .remove_duplicates(true)
///     .case(CaseTransform::Title)
///     .date_format(DateFormat::DayMonthYear)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Remove rows that duplicate an earlier row.
    /// Default: false
    pub remove_duplicates: bool,

    /// Replace missing cells with an empty string.
    /// Default: false
    pub fill_missing: bool,

    /// Trim and lowercase column names, stripping the literal `" ,"`.
    /// Default: false
    pub standardize_column_names: bool,

    /// Remove `'`, `_` and `,` from text values.
    /// Default: true
    pub remove_special_characters: bool,

    /// Collapse runs of whitespace inside text values to one space.
    /// Default: true
    pub collapse_whitespace: bool,

    /// Case transform for text values.
    /// Default: NoChange
    pub case: CaseTransform,

    /// Reformat date-like columns. `None` disables date standardization.
    /// Default: None
    pub date_format: Option<DateFormat>,

    /// Minimum share of non-missing values that must parse as dates before a
    /// column is reformatted (0.0 - 1.0). At 0.0 a single parsed value is
    /// enough.
    /// Default: 0.0
    pub date_match_ratio: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_duplicates: false,
            fill_missing: false,
            standardize_column_names: false,
            remove_special_characters: true,
            collapse_whitespace: true,
            case: CaseTransform::default(),
            date_format: None,
            date_match_ratio: 0.0,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Parse a configuration from JSON and validate it. Missing fields take
    /// their defaults.
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        let config: CleaningConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.date_match_ratio) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "date_match_ratio".to_string(),
                value: self.date_match_ratio,
            });
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Unknown value for '{field}': '{value}'")]
    UnknownOption { field: String, value: String },
}

impl From<ConfigValidationError> for crate::error::TableError {
    fn from(e: ConfigValidationError) -> Self {
        crate::error::TableError::InvalidConfig(e.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    remove_duplicates: Option<bool>,
    fill_missing: Option<bool>,
    standardize_column_names: Option<bool>,
    remove_special_characters: Option<bool>,
    collapse_whitespace: Option<bool>,
    case: Option<CaseTransform>,
    date_format: Option<DateFormat>,
    date_match_ratio: Option<f64>,
}

impl CleaningConfigBuilder {
    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Enable or disable filling missing cells with blanks.
    pub fn fill_missing(mut self, fill: bool) -> Self {
        self.fill_missing = Some(fill);
        self
    }

    /// Enable or disable column name standardization.
    pub fn standardize_column_names(mut self, standardize: bool) -> Self {
        self.standardize_column_names = Some(standardize);
        self
    }

    /// Enable or disable removal of `'`, `_` and `,` from text.
    pub fn remove_special_characters(mut self, remove: bool) -> Self {
        self.remove_special_characters = Some(remove);
        self
    }

    /// Enable or disable collapsing internal whitespace.
    pub fn collapse_whitespace(mut self, collapse: bool) -> Self {
        self.collapse_whitespace = Some(collapse);
        self
    }

    /// Set the text case transform.
    pub fn case(mut self, case: CaseTransform) -> Self {
        self.case = Some(case);
        self
    }

    /// Enable date standardization with the given output format.
    pub fn date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }

    /// Set the minimum parsed-date ratio for a column to be reformatted.
    ///
    /// # Arguments
    /// * `ratio` - Value between 0.0 and 1.0 (e.g., 0.8 = 80% must parse)
    pub fn date_match_ratio(mut self, ratio: f64) -> Self {
        self.date_match_ratio = Some(ratio);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            remove_duplicates: self.remove_duplicates.unwrap_or(defaults.remove_duplicates),
            fill_missing: self.fill_missing.unwrap_or(defaults.fill_missing),
            standardize_column_names: self
                .standardize_column_names
                .unwrap_or(defaults.standardize_column_names),
            remove_special_characters: self
                .remove_special_characters
                .unwrap_or(defaults.remove_special_characters),
            collapse_whitespace: self
                .collapse_whitespace
                .unwrap_or(defaults.collapse_whitespace),
            case: self.case.unwrap_or_default(),
            date_format: self.date_format,
            date_match_ratio: self.date_match_ratio.unwrap_or(defaults.date_match_ratio),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert!(!config.remove_duplicates);
        assert!(!config.fill_missing);
        assert!(!config.standardize_column_names);
        assert!(config.remove_special_characters);
        assert!(config.collapse_whitespace);
        assert_eq!(config.case, CaseTransform::NoChange);
        assert_eq!(config.date_format, None);
        assert_eq!(config.date_match_ratio, 0.0);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = CleaningConfig::builder().build().unwrap();
        assert_eq!(config, CleaningConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .remove_duplicates(true)
            .fill_missing(true)
            .remove_special_characters(false)
            .case(CaseTransform::Upper)
            .date_format(DateFormat::MonthDayYear)
            .date_match_ratio(0.5)
            .build()
            .unwrap();

        assert!(config.remove_duplicates);
        assert!(config.fill_missing);
        assert!(!config.remove_special_characters);
        assert_eq!(config.case, CaseTransform::Upper);
        assert_eq!(config.date_format, Some(DateFormat::MonthDayYear));
        assert_eq!(config.date_match_ratio, 0.5);
    }

    #[test]
    fn test_validation_invalid_ratio() {
        let result = CleaningConfig::builder().date_match_ratio(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "remove_duplicates": true,
            "case": "Title",
            "date_format": "DayMonthYear"
        }"#;

        let config: CleaningConfig = serde_json::from_str(json).unwrap();
        assert!(config.remove_duplicates);
        assert_eq!(config.case, CaseTransform::Title);
        assert_eq!(config.date_format, Some(DateFormat::DayMonthYear));
        // untouched fields keep their defaults
        assert!(config.collapse_whitespace);
        assert!(!config.fill_missing);
    }

    #[test]
    fn test_from_json_errors() {
        let err = CleaningConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "JSON_ERROR");

        let err = CleaningConfig::from_json(r#"{"date_match_ratio": 3.0}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let config = CleaningConfig::from_json(r#"{"fill_missing": true}"#).unwrap();
        assert!(config.fill_missing);
    }

    #[test]
    fn test_case_transform_from_label() {
        assert_eq!("Title Case".parse::<CaseTransform>().unwrap(), CaseTransform::Title);
        assert_eq!("UPPER CASE".parse::<CaseTransform>().unwrap(), CaseTransform::Upper);
        assert_eq!("lower".parse::<CaseTransform>().unwrap(), CaseTransform::Lower);
        assert_eq!("No Change".parse::<CaseTransform>().unwrap(), CaseTransform::NoChange);
        assert!("sentence".parse::<CaseTransform>().is_err());
    }

    #[test]
    fn test_date_format_from_label() {
        assert_eq!("dd-mm-yyyy".parse::<DateFormat>().unwrap(), DateFormat::DayMonthYear);
        assert_eq!(DateFormat::MonthDayYear.label(), "MM-DD-YYYY");
        assert!("YYYY/MM/DD".parse::<DateFormat>().is_err());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("jANE doe"), "Jane Doe");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("abc1def"), "Abc1Def");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_case_apply() {
        assert_eq!(CaseTransform::Upper.apply("Mixed"), "MIXED");
        assert_eq!(CaseTransform::Lower.apply("Mixed"), "mixed");
        assert_eq!(CaseTransform::NoChange.apply("Mixed"), "Mixed");
    }
}
