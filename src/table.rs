//! Normalized measurement tables.
//!
//! Materializes the numeric table behind a file once its columns are
//! resolved, derives the representative resistance and sorts rows by
//! measurement area.

use crate::config::{AnalysisConfig, MissingValuePolicy};
use crate::constants::labels;
use crate::error::{ProcessorError, Result};
use crate::models::{MeasurementFile, MeasurementType, ResolvedColumns, SourceKind};
use crate::source::{RawContent, coerce, split_cells};
use polars::prelude::{Column, DataFrame, PolarsResult};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Column-major numeric table keyed by resolved labels
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    kind: MeasurementType,
    names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Observed value range of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRange {
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Build the normalized table for a classified file
///
/// Comma-separated files and worksheets skip the header rows and coerce
/// bad cells to missing. Whitespace text keeps lines matching the table
/// width and applies the configured [`MissingValuePolicy`].
pub fn build(
    file: &MeasurementFile,
    content: &RawContent,
    resolved: &ResolvedColumns,
    kind: MeasurementType,
    config: &AnalysisConfig,
) -> Result<NormalizedTable> {
    let width = resolved.columns.len();
    let rows = match content {
        RawContent::Text(lines) if file.kind() == SourceKind::Csv => {
            delimited_rows(lines.iter().map(|line| split_cells(line, SourceKind::Csv)), &resolved.skip_rows, width)
        }
        RawContent::Sheet(rows) => delimited_rows(
            rows.iter().map(|row| row.iter().map(String::as_str).collect()),
            &resolved.skip_rows,
            width,
        ),
        RawContent::Text(lines) => whitespace_rows(lines, width, config.missing_value_policy),
    };

    if rows.is_empty() {
        return Err(ProcessorError::EmptyTable {
            path: file.path().to_path_buf(),
        });
    }

    let mut table = NormalizedTable::from_rows(kind, resolved.columns.labels().to_vec(), &rows);
    table.derive_resistance();
    table.sort_by_area();
    debug!(
        "Built {} table with {} rows and columns {:?}",
        kind,
        table.row_count(),
        table.names
    );
    Ok(table)
}

fn delimited_rows<'a, I>(rows: I, skip_rows: &[usize], width: usize) -> Vec<Vec<Option<f64>>>
where
    I: Iterator<Item = Vec<&'a str>>,
{
    rows.enumerate()
        .filter(|(index, _)| !skip_rows.contains(index))
        .filter(|(_, cells)| cells.iter().any(|cell| !cell.trim().is_empty()))
        .map(|(_, cells)| (0..width).map(|i| cells.get(i).and_then(|cell| coerce(cell))).collect::<Vec<_>>())
        .filter(|row| row.iter().any(Option::is_some))
        .collect()
}

fn whitespace_rows(lines: &[String], width: usize, policy: MissingValuePolicy) -> Vec<Vec<Option<f64>>> {
    let mut dropped = 0;
    let rows: Vec<Vec<Option<f64>>> = lines
        .iter()
        .map(|line| split_cells(line, SourceKind::Text))
        .filter(|cells| cells.len() == width)
        .map(|cells| cells.into_iter().map(coerce).collect::<Vec<_>>())
        .filter(|row| match policy {
            MissingValuePolicy::DropRow => {
                let complete = row.iter().all(Option::is_some);
                if !complete {
                    dropped += 1;
                }
                complete
            }
            MissingValuePolicy::CoerceToMissing => row.iter().any(Option::is_some),
        })
        .collect();

    if dropped > 0 {
        warn!("Dropped {} rows with non-numeric cells", dropped);
    }
    rows
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn compare_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl NormalizedTable {
    /// Assemble a table from row-major values; short rows are padded
    pub fn from_rows(kind: MeasurementType, names: Vec<String>, rows: &[Vec<Option<f64>>]) -> Self {
        let columns = (0..names.len())
            .map(|i| rows.iter().map(|row| row.get(i).copied().flatten()).collect())
            .collect();
        Self { kind, names, columns }
    }

    pub fn kind(&self) -> MeasurementType {
        self.kind
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Values of the first column named `name`
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Value at `row` in column `name`, missing when either is absent
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|values| values.get(row).copied().flatten())
    }

    fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) {
        match self.names.iter().position(|n| n == name) {
            Some(i) => self.columns[i] = values,
            None => {
                self.names.push(name.to_string());
                self.columns.push(values);
            }
        }
    }

    /// Derive `R` (median) and `R_ave` (mean) across the replicates
    ///
    /// Single-resistance tables already carry `R`.
    fn derive_resistance(&mut self) {
        if !self.kind.is_triplicate() {
            return;
        }

        let (mut means, mut medians) = (Vec::new(), Vec::new());
        for row in 0..self.row_count() {
            let mut readings: Vec<f64> = [labels::R1, labels::R2, labels::R3]
                .iter()
                .filter_map(|name| self.value(name, row))
                .collect();
            means.push(if readings.is_empty() {
                None
            } else {
                Some(readings.iter().sum::<f64>() / readings.len() as f64)
            });
            medians.push(median(&mut readings));
        }

        self.set_column(labels::R_AVE, means);
        self.set_column(labels::R, medians);
    }

    /// Sort by `MA`, else by `(y, x)`; missing keys sort last
    fn sort_by_area(&mut self) {
        let keys: Vec<&str> = if self.has_column(labels::MA) {
            vec![labels::MA]
        } else if self.has_column(labels::X) && self.has_column(labels::Y) {
            vec![labels::Y, labels::X]
        } else {
            return;
        };

        let mut order: Vec<usize> = (0..self.row_count()).collect();
        order.sort_by(|&a, &b| {
            keys.iter()
                .map(|key| compare_missing_last(self.value(key, a), self.value(key, b)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        for column in &mut self.columns {
            *column = order.iter().map(|&i| column[i]).collect();
        }
    }

    /// Copy with negative readings removed, used for per-temperature and
    /// overall statistics
    ///
    /// Room-temperature triplicates lose only the negative replicate; every
    /// other type loses the whole row.
    pub fn without_negative_readings(&self) -> NormalizedTable {
        let is_negative = |value: Option<f64>| value.is_some_and(|v| v < 0.0);
        let mut table = self.clone();

        match self.kind {
            MeasurementType::Triplicate => {
                for name in [labels::R1, labels::R2, labels::R3] {
                    if let Some(i) = table.names.iter().position(|n| n == name) {
                        for value in &mut table.columns[i] {
                            if is_negative(*value) {
                                *value = None;
                            }
                        }
                    }
                }
            }
            kind => {
                let checked: &[&str] = if kind.is_triplicate() {
                    &[labels::R1, labels::R2, labels::R3]
                } else {
                    &[labels::R]
                };
                let keep: Vec<bool> = (0..self.row_count())
                    .map(|row| !checked.iter().any(|name| is_negative(self.value(name, row))))
                    .collect();
                for column in &mut table.columns {
                    *column = column
                        .iter()
                        .zip(&keep)
                        .filter(|(_, keep)| **keep)
                        .map(|(value, _)| *value)
                        .collect();
                }
            }
        }

        table.derive_resistance();
        table
    }

    /// Min and max of every column, ignoring missing values
    pub fn column_ranges(&self) -> Vec<ColumnRange> {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(name, values)| {
                let present = values.iter().flatten().copied();
                ColumnRange {
                    name: name.clone(),
                    min: present.clone().reduce(f64::min),
                    max: present.reduce(f64::max),
                }
            })
            .collect()
    }

    /// Polars view of the table; repeated labels keep their first column
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut seen: Vec<&str> = Vec::new();
        let mut frame_columns = Vec::new();
        for (name, values) in self.names.iter().zip(&self.columns) {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);
            frame_columns.push(Column::new(name.as_str().into(), values.as_slice()));
        }
        DataFrame::new(frame_columns)
    }
}
