//! Column name synthesis for header-less files.
//!
//! Guesses a layout from the surviving floatable-column counts, then
//! accepts it only when the resistance replicates agree with each other.

use crate::config::AnalysisConfig;
use crate::constants::{WIDTH_GUESSES, labels};
use crate::models::{ColumnNameSet, SourceKind};
use crate::source::{RawContent, coerce, split_cells};
use tracing::{debug, warn};

/// Guess column names for a file without keywords
///
/// `widths` are the candidate table widths (profile keys for text, the
/// sheet width for workbooks). Returns an empty set when no layout fits
/// or the replicate check rejects the guess.
pub fn synthesize(
    content: &RawContent,
    kind: SourceKind,
    widths: &[usize],
    config: &AnalysisConfig,
) -> ColumnNameSet {
    let Some(guess) = WIDTH_GUESSES
        .iter()
        .find(|(width, _)| widths.contains(width))
        .map(|(_, names)| ColumnNameSet::from_labels(names))
    else {
        debug!("No layout guess for widths {:?}", widths);
        return ColumnNameSet::default();
    };

    let rows = materialize(content, kind, guess.len());
    if rows.is_empty() {
        warn!("No rows match guessed width {}", guess.len());
        return ColumnNameSet::default();
    }

    let columns = relabel(guess, &rows, config);
    if replicates_agree(&columns, &rows, config) {
        debug!("Accepted inferred columns {}", columns);
        columns
    } else {
        debug!("Rejected inferred columns {}: replicates disagree", columns);
        ColumnNameSet::default()
    }
}

/// Rows whose cell count equals `width`, coerced to numbers
fn materialize(content: &RawContent, kind: SourceKind, width: usize) -> Vec<Vec<Option<f64>>> {
    match content {
        RawContent::Text(lines) => lines
            .iter()
            .map(|line| split_cells(line, kind))
            .filter(|cells| cells.len() == width)
            .map(|cells| cells.into_iter().map(coerce).collect())
            .collect(),
        RawContent::Sheet(rows) => rows
            .iter()
            .map(|row| {
                let used = row.iter().rposition(|cell| !cell.trim().is_empty()).map_or(0, |i| i + 1);
                &row[..used]
            })
            .filter(|cells| cells.len() == width)
            .map(|cells| cells.iter().map(|cell| coerce(cell)).collect())
            .collect(),
    }
}

fn column_is_temperature(rows: &[Vec<Option<f64>>], index: usize, config: &AnalysisConfig) -> bool {
    rows.iter().all(|row| {
        row.get(index)
            .copied()
            .flatten()
            .is_some_and(|value| config.is_plausible_temperature(value))
    })
}

/// Promote temperature-like columns to `T_set`
fn relabel(mut columns: ColumnNameSet, rows: &[Vec<Option<f64>>], config: &AnalysisConfig) -> ColumnNameSet {
    for unknown in ["unknown_1", "unknown_2"] {
        if let Some(index) = columns.position(unknown) {
            if column_is_temperature(rows, index, config) {
                columns.rename(index, labels::T_SET);
            }
        }
    }

    if let Some(index) = columns.position(labels::X) {
        if column_is_temperature(rows, index, config) {
            debug!("First column holds set temperatures, using temperature-first layout");
            let mut relabeled: Vec<String> = columns.labels().to_vec();
            let leading = [labels::T_SET, labels::R1, labels::R2, labels::R3];
            for (slot, label) in relabeled.iter_mut().zip(leading) {
                *slot = label.to_string();
            }
            if relabeled.len() > leading.len() {
                relabeled[leading.len()] = labels::UNKNOWN_TRAILING.to_string();
            }
            columns = ColumnNameSet::new(relabeled);
        }
    }

    columns
}

/// Pooled relative-error check over the three replicate columns
///
/// A value passes when it lies within `relative_error_percent` of the row
/// average `|R1+R2+R3|/3`. Missing values and zero averages fail.
fn replicates_agree(columns: &ColumnNameSet, rows: &[Vec<Option<f64>>], config: &AnalysisConfig) -> bool {
    let (Some(i1), Some(i2), Some(i3)) = (
        columns.position(labels::R1),
        columns.position(labels::R2),
        columns.position(labels::R3),
    ) else {
        return false;
    };

    let total = rows.len() * 3;
    let accepted: usize = rows
        .iter()
        .map(|row| {
            let values = [i1, i2, i3].map(|i| row.get(i).copied().flatten().unwrap_or(f64::NAN));
            let average = (values[0] + values[1] + values[2]).abs() / 3.0;
            values
                .iter()
                .filter(|&&value| (value - average).abs() / average * 100.0 < config.relative_error_percent)
                .count()
        })
        .sum();

    let accepted_percent = accepted as f64 / total as f64 * 100.0;
    debug!(
        "Replicate agreement: {}/{} values ({:.1}%)",
        accepted, total, accepted_percent
    );
    accepted_percent > config.min_required_rows_percent
}
