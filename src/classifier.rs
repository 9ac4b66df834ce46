//! Measurement-type classification.
//!
//! Resolved labels are compared by exact set equality, after removing the
//! area identification labels, against the canonical measurement shapes.

use crate::constants::labels;
use crate::models::{ColumnNameSet, MeasurementType};
use std::collections::BTreeSet;
use tracing::debug;

/// Canonical label sets in precedence order
const CANONICAL_SHAPES: &[(&[&str], MeasurementType)] = &[
    (
        &[labels::R1, labels::R2, labels::R3, labels::T_SET],
        MeasurementType::TriplicateTemperatureDependent,
    ),
    (&[labels::R1, labels::R2, labels::R3], MeasurementType::Triplicate),
    (&[labels::R, labels::T_SET], MeasurementType::SingleTemperatureDependent),
    (&[labels::R], MeasurementType::Single),
];

/// Labels that identify the measurement area rather than the measurement
const AREA_LABELS: &[&str] = &[labels::X, labels::Y, labels::MA];

/// Map resolved columns to exactly one measurement type
pub fn classify(columns: &ColumnNameSet) -> MeasurementType {
    let measured: BTreeSet<&str> = columns
        .iter()
        .filter(|label| !AREA_LABELS.contains(label))
        .collect();

    let kind = CANONICAL_SHAPES
        .iter()
        .find(|(shape, _)| measured == shape.iter().copied().collect::<BTreeSet<&str>>())
        .map(|(_, kind)| *kind)
        .unwrap_or(MeasurementType::Unknown);

    debug!("Columns {} classified as {}", columns, kind);
    kind
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_labels(labels: &[&str]) -> MeasurementType {
        classify(&ColumnNameSet::from_labels(labels))
    }

    #[test]
    fn test_canonical_shapes() {
        assert_eq!(
            classify_labels(&["x", "y", "R1", "R2", "R3"]),
            MeasurementType::Triplicate
        );
        assert_eq!(
            classify_labels(&["T_set", "R1", "R2", "R3"]),
            MeasurementType::TriplicateTemperatureDependent
        );
        assert_eq!(
            classify_labels(&["MA", "T_set", "R"]),
            MeasurementType::SingleTemperatureDependent
        );
        assert_eq!(classify_labels(&["x", "y", "R"]), MeasurementType::Single);
    }

    #[test]
    fn test_superset_is_unknown() {
        assert_eq!(
            classify_labels(&["R1", "R2", "R3", "T_set", "extra"]),
            MeasurementType::Unknown
        );
        assert_eq!(
            classify_labels(&["x", "y", "R", "unknown_0"]),
            MeasurementType::Unknown
        );
    }

    #[test]
    fn test_order_and_duplicates_do_not_matter() {
        assert_eq!(
            classify_labels(&["R3", "R1", "x", "R2", "y", "R1"]),
            MeasurementType::Triplicate
        );
    }

    #[test]
    fn test_no_resistance_is_unknown() {
        assert_eq!(classify_labels(&["x", "y"]), MeasurementType::Unknown);
        assert_eq!(classify_labels(&[]), MeasurementType::Unknown);
    }
}
