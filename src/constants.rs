//! Application constants for the four-point-probe processor
//!
//! Keyword lists, numeric tolerances, layout guesses and the verdict
//! texts returned to the surrounding service.

// =============================================================================
// Header Keywords
// =============================================================================

/// Resistance-related tokens that mark a header row
pub const RESISTANCE_KEYWORDS: &[&str] = &["R1", "R2", "R3", "R", "Resistance"];

/// Profile entry carrying the keyword occurrence count
pub const KEYWORD_ENTRY: &str = "keyword";

// =============================================================================
// Column Labels
// =============================================================================

pub mod labels {
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const R1: &str = "R1";
    pub const R2: &str = "R2";
    pub const R3: &str = "R3";
    pub const R: &str = "R";
    pub const T_SET: &str = "T_set";
    pub const MA: &str = "MA";

    /// Derived triplicate mean
    pub const R_AVE: &str = "R_ave";

    /// Name used for `R` in the data table when `R_ave` is also present
    pub const R_MEDIAN: &str = "R_median";

    /// Prefix for trailing columns appended during width reconciliation
    pub const UNKNOWN_PREFIX: &str = "unknown_";

    /// Prefix for empty header cells
    pub const HEADER_PREFIX: &str = "header";

    /// Trailing column of the temperature-first layout
    pub const UNKNOWN_TRAILING: &str = "unknown";
}

// =============================================================================
// Shape Heuristics
// =============================================================================

/// Number of multi-float lines sampled before the scanner stops
pub const HISTOGRAM_LINE_CAP: usize = 100;

/// A floatable-column count must recur more often than this to survive pruning
pub const MIN_WIDTH_RECURRENCE: usize = 5;

/// Minimum profile size for a file to contain a table ("keyword" + one width)
pub const MIN_PROFILE_ENTRIES: usize = 2;

/// Layout guesses for header-less files, keyed by floatable-column count
pub const WIDTH_GUESSES: &[(usize, &[&str])] = &[
    (5, &["x", "y", "R1", "R2", "R3"]),
    (7, &["x", "y", "R1", "R2", "R3", "unknown_1", "unknown_2"]),
    (6, &["x", "y", "R1", "R2", "R3", "unknown_1"]),
    (4, &["x", "R1", "R2", "R3"]),
];

/// Width of the cyclic temperature-sweep files handled outside the core
pub const SWEEP_COLUMN_COUNT: usize = 343;

// =============================================================================
// Domain Tolerances
// =============================================================================

/// Expected number of measurement areas on a materials library
pub const EXPECTED_AREA_COUNT: usize = 342;

/// Replicates must sit within this relative error (percent) of the row average
pub const RELATIVE_ERROR_PERCENT: f64 = 10.0;

/// Share (percent) of replicate values that must pass the relative error check
pub const MIN_REQUIRED_ROWS_PERCENT: f64 = 80.0;

/// Set temperatures are integers in `[MIN, MAX)` degrees Celsius
pub const TEMPERATURE_RANGE_MIN: i64 = -50;
pub const TEMPERATURE_RANGE_MAX: i64 = 300;

// =============================================================================
// Validation Verdicts
// =============================================================================

pub mod verdict {
    pub const OK: i32 = 0;
    pub const AREA_COUNT_MISMATCH: i32 = 300;
    pub const COLUMNS_UNRESOLVED: i32 = 400;
    pub const NO_TABLE: i32 = 500;

    pub const NO_TABLE_MESSAGE: &str =
        "This file is not valid:Table of measurement was not found";

    pub const COLUMNS_UNRESOLVED_MESSAGE: &str = "Column names have not been defined correctly, \
         name the column related to resistance measurement R, in case of more than once \
         resistance measurement please name the related columns R1, R2, ...";

    pub const NO_COORDINATE_MESSAGE: &str = " Coordinate was not found, there should be a column \
         with name of MA or two columns with names of x and y to find coordinate";

    pub const AREA_COUNT_MESSAGE: &str = "The measurement areas are more or less than 342.\
         File can be valid, if the coordinates are defined completely or the MA corresponding \
         each coordinate be specified in a separate column";

    pub const INFERRED_COLUMNS_WARNING: &str = "Columns names are inferred from the file structure";
}

// =============================================================================
// File Handling
// =============================================================================

/// Extensions read as comma-separated text
pub const CSV_EXTENSIONS: &[&str] = &["csv"];

/// Whitespace-delimited exports picked up when a directory is scanned
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "dat", "tsv"];

/// Extensions read as workbooks
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Config file name under the user config directory
pub const CONFIG_DIR_NAME: &str = "fourpp-processor";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Timestamp format for per-run log files
pub const LOG_FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
