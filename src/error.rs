//! Error handling for measurement file analysis.
//!
//! Structural failures (no table, unnamed columns, missing coordinates) are
//! distinct variants so the validator can translate them into verdicts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found at path: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read spreadsheet {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },

    #[error("No measurement table found in file: {path}")]
    NoTableFound { path: PathBuf },

    #[error("Column names could not be resolved for file: {path}")]
    ColumnsUnresolved { path: PathBuf },

    #[error("No measurement area key (MA or x/y) in file: {path}")]
    MissingAreaKey { path: PathBuf },

    #[error("Unknown measurement type in file {path}, columns: {columns}")]
    UnknownMeasurementType { path: PathBuf, columns: String },

    #[error("Expected {expected} measurement areas, found {found}")]
    AreaCountMismatch { expected: usize, found: usize },

    #[error("No rows could be loaded from file: {path}")]
    EmptyTable { path: PathBuf },

    #[error("File {path} is a temperature-sweep file and no sweep processor is registered")]
    SweepFile { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
