//! File validation.
//!
//! Runs the pipeline stages in order and turns every structural failure
//! into a [`ValidationVerdict`]. Only I/O failures escape as errors.

use crate::aggregate::{area_stats, distinct_coordinates};
use crate::classifier::classify;
use crate::constants::{labels, verdict};
use crate::error::{ProcessorError, Result};
use crate::models::{MeasurementType, ValidationVerdict};
use crate::pipeline::{Analyzer, FileAnalysis, Resolution};
use crate::table;
use tracing::{debug, warn};

/// Validate a loaded, non-sweep file
///
/// | verdict | condition |
/// |---|---|
/// | 500 | no table in the profile, or no numeric rows |
/// | 400 | columns unresolved, no area key, or unknown measurement type |
/// | 300 | coordinates do not cover the expected number of areas |
/// | 0   | valid; warns when the columns were inferred |
pub fn file_validation(analyzer: &Analyzer, analysis: &FileAnalysis) -> Result<ValidationVerdict> {
    let resolved = match analyzer.resolution(analysis) {
        Resolution::NoTable => {
            return Ok(ValidationVerdict::failure(
                verdict::NO_TABLE,
                verdict::NO_TABLE_MESSAGE,
            ));
        }
        Resolution::Unresolved => {
            return Ok(ValidationVerdict::failure(
                verdict::COLUMNS_UNRESOLVED,
                verdict::COLUMNS_UNRESOLVED_MESSAGE,
            ));
        }
        Resolution::Resolved(resolved) => resolved,
    };

    let columns = &resolved.columns;
    if !columns.has_area_key() {
        return Ok(ValidationVerdict::failure(
            verdict::COLUMNS_UNRESOLVED,
            verdict::NO_COORDINATE_MESSAGE,
        ));
    }

    let kind = classify(columns);
    if kind == MeasurementType::Unknown {
        warn!("Unknown measurement type for columns {}", columns);
        let message = format!(
            "{} Columns found: {}",
            verdict::COLUMNS_UNRESOLVED_MESSAGE,
            columns
        );
        return Ok(ValidationVerdict::failure(verdict::COLUMNS_UNRESOLVED, &message));
    }

    let table = match table::build(
        &analysis.file,
        &analysis.content,
        &resolved,
        kind,
        analyzer.config(),
    ) {
        Ok(table) => table,
        Err(ProcessorError::EmptyTable { .. }) => {
            return Ok(ValidationVerdict::failure(
                verdict::NO_TABLE,
                verdict::NO_TABLE_MESSAGE,
            ));
        }
        Err(e) => return Err(e),
    };
    let areas = area_stats(&table)?;
    debug!("Validated table with {} grouped areas", areas.len());

    let warning = resolved
        .inferred
        .then(|| verdict::INFERRED_COLUMNS_WARNING.to_string());

    if columns.contains(labels::MA) {
        return Ok(ValidationVerdict::ok(warning));
    }

    let found = distinct_coordinates(&table).len();
    let expected = analyzer.config().expected_area_count;
    if found != expected {
        debug!("Found {} distinct coordinates, expected {}", found, expected);
        return Ok(ValidationVerdict {
            code: verdict::AREA_COUNT_MISMATCH,
            message: Some(verdict::AREA_COUNT_MESSAGE.to_string()),
            warning,
        });
    }

    Ok(ValidationVerdict::ok(warning))
}
