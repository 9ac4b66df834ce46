//! Four-Point-Probe Processor Library
//!
//! Structure inference, validation and aggregation for resistance
//! measurement files exported by four-point-probe instruments.
//!
//! This library provides tools for:
//! - Profiling CSV, whitespace text and spreadsheet exports by keywords and shape
//! - Recovering column names from headers, or inferring them for header-less files
//! - Classifying files into room-temperature and temperature-dependent measurement types
//! - Validating files against the 342-area materials library layout
//! - Producing per-area and overall resistance records for the sample store
//! - Batch processing many files concurrently from the command line

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod scanner;
pub mod source;
pub mod synthesizer;
pub mod table;
pub mod validator;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
    pub mod input;
}

// Re-export commonly used types
pub use config::{AnalysisConfig, MissingValuePolicy};
pub use error::{ProcessorError, Result};
pub use formatter::{AreaPayload, DataTableResponse, OverallPayload};
pub use models::{ColumnNameSet, MeasurementFile, MeasurementType, ResolvedColumns, ValidationVerdict};
pub use pipeline::{Analyzer, SweepProcessor};
pub use scanner::KeywordShapeProfile;
