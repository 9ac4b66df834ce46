//! Configuration management and validation.
//!
//! Every tolerance used by the analysis stages lives here with its
//! laboratory default. A config is read-only once an analysis starts, so
//! concurrent analyses of different files can share one instance.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, EXPECTED_AREA_COUNT, HISTOGRAM_LINE_CAP,
    MIN_REQUIRED_ROWS_PERCENT, MIN_WIDTH_RECURRENCE, RELATIVE_ERROR_PERCENT,
    RESISTANCE_KEYWORDS, SWEEP_COLUMN_COUNT, TEMPERATURE_RANGE_MAX, TEMPERATURE_RANGE_MIN,
};
use crate::error::{ProcessorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Treatment of unparseable cells when whitespace text is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Keep the row, the cell becomes missing
    CoerceToMissing,
    /// Discard any row with a missing cell
    DropRow,
}

/// Tunables for structure inference and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Header tokens identifying resistance columns
    pub keywords: Vec<String>,

    /// Multi-float lines sampled before scanning stops
    pub histogram_line_cap: usize,

    /// A column count must recur more often than this to count as table width
    pub min_width_recurrence: usize,

    /// Replicate tolerance, percent of the row average
    pub relative_error_percent: f64,

    /// Share of replicate values (percent) that must be within tolerance
    pub min_required_rows_percent: f64,

    /// Lower bound (inclusive) of plausible set temperatures
    pub temperature_min: i64,

    /// Upper bound (exclusive) of plausible set temperatures
    pub temperature_max: i64,

    /// Measurement areas on a complete materials library
    pub expected_area_count: usize,

    /// Width of files routed to the sweep processor
    pub sweep_column_count: usize,

    /// Unparseable cells in whitespace-delimited text
    pub missing_value_policy: MissingValuePolicy,

    /// Concurrent files in batch mode (0 = number of CPUs)
    pub workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keywords: RESISTANCE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            histogram_line_cap: HISTOGRAM_LINE_CAP,
            min_width_recurrence: MIN_WIDTH_RECURRENCE,
            relative_error_percent: RELATIVE_ERROR_PERCENT,
            min_required_rows_percent: MIN_REQUIRED_ROWS_PERCENT,
            temperature_min: TEMPERATURE_RANGE_MIN,
            temperature_max: TEMPERATURE_RANGE_MAX,
            expected_area_count: EXPECTED_AREA_COUNT,
            sweep_column_count: SWEEP_COLUMN_COUNT,
            missing_value_policy: MissingValuePolicy::DropRow,
            workers: 0,
        }
    }
}

impl AnalysisConfig {
    /// Create configuration with laboratory defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ProcessorError::Configuration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ProcessorError::Configuration {
            message: format!("invalid config {}: {}", path.display(), e),
        })?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit file if given, else the user config file if it
    /// exists, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config_dir>/fourpp-processor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn with_missing_value_policy(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_value_policy = policy;
        self
    }

    pub fn with_expected_area_count(mut self, count: usize) -> Self {
        self.expected_area_count = count;
        self
    }

    pub fn with_relative_error_percent(mut self, percent: f64) -> Self {
        self.relative_error_percent = percent;
        self
    }

    pub fn with_histogram_line_cap(mut self, cap: usize) -> Self {
        self.histogram_line_cap = cap;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Worker count with 0 resolved to the number of CPUs
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// True when `value` is an integer set temperature in the plausible range
    pub fn is_plausible_temperature(&self, value: f64) -> bool {
        value.fract() == 0.0
            && value >= self.temperature_min as f64
            && value < self.temperature_max as f64
    }

    /// Reject values that would make the heuristics meaningless
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(ProcessorError::Configuration {
                message: message.to_string(),
            })
        };

        if self.keywords.is_empty() || self.keywords.iter().any(String::is_empty) {
            return invalid("keywords must be a non-empty list of non-empty tokens");
        }
        if self.histogram_line_cap == 0 {
            return invalid("histogram_line_cap must be greater than 0");
        }
        if !(0.0..=100.0).contains(&self.relative_error_percent) {
            return invalid("relative_error_percent must be within 0..=100");
        }
        if !(0.0..=100.0).contains(&self.min_required_rows_percent) {
            return invalid("min_required_rows_percent must be within 0..=100");
        }
        if self.temperature_min >= self.temperature_max {
            return invalid("temperature_min must be below temperature_max");
        }
        if self.expected_area_count == 0 {
            return invalid("expected_area_count must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.keywords, vec!["R1", "R2", "R3", "R", "Resistance"]);
        assert_eq!(config.expected_area_count, 342);
        assert_eq!(config.missing_value_policy, MissingValuePolicy::DropRow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = AnalysisConfig::new()
            .with_missing_value_policy(MissingValuePolicy::CoerceToMissing)
            .with_expected_area_count(100)
            .with_workers(3);
        assert_eq!(config.missing_value_policy, MissingValuePolicy::CoerceToMissing);
        assert_eq!(config.expected_area_count, 100);
        assert_eq!(config.effective_workers(), 3);
    }

    #[test]
    fn test_plausible_temperature() {
        let config = AnalysisConfig::default();
        assert!(config.is_plausible_temperature(-50.0));
        assert!(config.is_plausible_temperature(25.0));
        assert!(config.is_plausible_temperature(299.0));
        assert!(!config.is_plausible_temperature(300.0));
        assert!(!config.is_plausible_temperature(25.5));
        assert!(!config.is_plausible_temperature(f64::NAN));
    }

    #[test]
    fn test_load_partial_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "relative_error_percent = 5.0").unwrap();
        writeln!(temp_file, "missing_value_policy = \"coerce_to_missing\"").unwrap();
        temp_file.flush().unwrap();

        let config = AnalysisConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.relative_error_percent, 5.0);
        assert_eq!(config.missing_value_policy, MissingValuePolicy::CoerceToMissing);
        assert_eq!(config.histogram_line_cap, 100);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "histogram_line_cap = 0").unwrap();
        temp_file.flush().unwrap();

        let result = AnalysisConfig::load(temp_file.path());
        assert!(matches!(result, Err(ProcessorError::Configuration { .. })));
    }
}
