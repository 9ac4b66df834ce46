//! Command-line argument definitions for the four-point-probe processor
//!
//! Every subcommand takes the same batch arguments and applies one
//! analysis operation to each input file.

use crate::config::{AnalysisConfig, MissingValuePolicy};
use crate::error::{ProcessorError, Result};
use crate::processor::Operation;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the four-point-probe processor
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fourpp",
    version,
    about = "Validate and summarize four-point-probe resistance measurement files",
    long_about = "Infers the table structure of four-point-probe resistance exports (CSV, \
                  whitespace text and spreadsheets), validates them against the materials \
                  library layout and produces per-area and overall resistance records."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Validate files and report a verdict code per file
    Validate(BatchArgs),
    /// Emit the normalized measurement table of each file
    Table(BatchArgs),
    /// Emit per-measurement-area resistance records
    Areas(BatchArgs),
    /// Emit overall (or per set temperature) resistance records
    Overall(BatchArgs),
    /// Show the keyword/shape profile, resolved columns and measurement type
    Inspect(BatchArgs),
}

/// Arguments shared by every subcommand
#[derive(Debug, Clone, Parser)]
pub struct BatchArgs {
    /// Input files, directories or glob patterns
    ///
    /// Directories are searched recursively for CSV, text and spreadsheet
    /// files.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Path to configuration file
    ///
    /// TOML configuration file overriding analysis tolerances. If not
    /// specified, looks for ~/.config/fourpp-processor/config.toml
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Number of parallel workers
    ///
    /// Defaults to the configured worker count, or the number of CPUs.
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Number of files analysed concurrently"
    )]
    pub workers: Option<usize>,

    /// Output directory; one document per input file is written there
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Write one output file per input into this directory"
    )]
    pub output_path: Option<PathBuf>,

    /// Output format for results
    #[arg(
        long = "format",
        value_enum,
        default_value = "human",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,

    /// Treatment of unparseable cells in whitespace-delimited files
    #[arg(long = "missing-values", value_enum, value_name = "POLICY")]
    pub missing_values: Option<MissingValues>,

    /// Number of measurement areas a complete library has
    #[arg(long = "expected-areas", value_name = "COUNT")]
    pub expected_areas: Option<usize>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Also write the log to a timestamped file in this directory
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Output format options for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
    /// CSV format for data analysis
    Csv,
}

/// CLI names for [`MissingValuePolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingValues {
    /// Keep the row and mark the cell missing
    Coerce,
    /// Drop rows with unparseable cells
    Drop,
}

impl From<MissingValues> for MissingValuePolicy {
    fn from(value: MissingValues) -> Self {
        match value {
            MissingValues::Coerce => MissingValuePolicy::CoerceToMissing,
            MissingValues::Drop => MissingValuePolicy::DropRow,
        }
    }
}

impl Args {
    /// Operation and batch arguments of the chosen subcommand
    pub fn operation(&self) -> (Operation, &BatchArgs) {
        match &self.command {
            Commands::Validate(args) => (Operation::Validate, args),
            Commands::Table(args) => (Operation::Table, args),
            Commands::Areas(args) => (Operation::Areas, args),
            Commands::Overall(args) => (Operation::Overall, args),
            Commands::Inspect(args) => (Operation::Inspect, args),
        }
    }
}

impl BatchArgs {
    /// Validate the arguments for consistency
    pub fn validate(&self, operation: Operation) -> Result<()> {
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(ProcessorError::Configuration {
                    message: "Number of workers must be greater than 0".to_string(),
                });
            }
            if workers > 100 {
                return Err(ProcessorError::Configuration {
                    message: "Number of workers cannot exceed 100".to_string(),
                });
            }
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(ProcessorError::Configuration {
                    message: format!("Config file does not exist: {}", config_file.display()),
                });
            }
        }

        let csv_to_stdout = self.output_format == OutputFormat::Csv && self.output_path.is_none();
        if csv_to_stdout && operation != Operation::Validate {
            return Err(ProcessorError::Configuration {
                message: format!(
                    "CSV output of '{}' needs an output directory (--output)",
                    operation.name()
                ),
            });
        }

        Ok(())
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(policy) = self.missing_values {
            config.missing_value_policy = policy.into();
        }
        if let Some(count) = self.expected_areas {
            config.expected_area_count = count;
        }
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars only for interactive human output
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }
}
