//! Database record formatting.
//!
//! Reshapes tables and statistics into the JSON documents consumed by the
//! sample store. Every numeric value crosses into a payload as a [`Scalar`],
//! so the serialized form never depends on how a value was computed.

use crate::aggregate::{
    AreaId, AreaStats, Extreme, MeasurementAreaIndex, ResistanceStats, TemperatureStats, extremes,
    rows_of, temperature_bounds,
};
use crate::constants::labels;
use crate::table::NormalizedTable;
use polars::prelude::{Column, DataFrame, PolarsResult};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Property type of numeric values in the store
const NUMERIC_PROPERTY: i32 = 1;
/// Property type of predicate (selector) values
const PREDICATE_PROPERTY: i32 = 2;

/// Plain numeric value at the serialization boundary
///
/// Non-finite floats serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Missing,
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Scalar::Int(value) => serializer.serialize_i64(value),
            Scalar::Float(value) if value.is_finite() => serializer.serialize_f64(value),
            Scalar::Float(_) | Scalar::Missing => serializer.serialize_none(),
        }
    }
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Int(value) => Some(value as f64),
            Scalar::Float(value) if value.is_finite() => Some(value),
            Scalar::Float(_) | Scalar::Missing => None,
        }
    }
}

impl From<Option<f64>> for Scalar {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Scalar::Missing, Scalar::Float)
    }
}

impl From<AreaId> for Scalar {
    fn from(id: AreaId) -> Self {
        match id {
            AreaId::Index(p) => Scalar::Int(p as i64),
            AreaId::Explicit(ma) if ma.fract() == 0.0 && ma.abs() < 1e15 => Scalar::Int(ma as i64),
            AreaId::Explicit(ma) => Scalar::Float(ma),
        }
    }
}

/// Floats always show a fractional part (`25.0`), missing renders as `nan`
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Scalar::Int(value) => write!(f, "{}", value),
            Scalar::Float(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 => {
                write!(f, "{:.1}", value)
            }
            Scalar::Float(value) => write!(f, "{}", value),
            Scalar::Missing => f.write_str("nan"),
        }
    }
}

// =============================================================================
// Data Table
// =============================================================================

/// One table row, serialized as an ordered JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow(pub Vec<(String, Scalar)>);

impl Serialize for DataRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTableResponse {
    #[serde(rename = "DataTable")]
    pub data_table: Vec<DataRow>,
}

impl DataTableResponse {
    /// Columnar view for CSV export; columns follow the first row and
    /// repeated names keep their first column
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let Some(first) = self.data_table.first() else {
            return Ok(DataFrame::empty());
        };

        let mut seen: Vec<&str> = Vec::new();
        let mut columns = Vec::new();
        for (index, (name, _)) in first.0.iter().enumerate() {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);
            let values: Vec<Option<f64>> = self
                .data_table
                .iter()
                .map(|row| row.0.get(index).and_then(|(_, value)| value.as_f64()))
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        DataFrame::new(columns)
    }
}

/// Output column names; `R` becomes `R_median` next to `R_ave`
pub fn output_names(table: &NormalizedTable) -> Vec<String> {
    let rename = table.has_column(labels::R_AVE) && table.has_column(labels::R);
    table
        .names()
        .iter()
        .map(|name| {
            if rename && name == labels::R {
                labels::R_MEDIAN.to_string()
            } else {
                name.clone()
            }
        })
        .collect()
}

/// One JSON object per table row
pub fn data_table(table: &NormalizedTable) -> DataTableResponse {
    let names = output_names(table);
    let columns: Vec<&[Option<f64>]> = table
        .names()
        .iter()
        .filter_map(|name| table.column(name))
        .collect();

    let data_table = (0..table.row_count())
        .map(|row| {
            DataRow(
                names
                    .iter()
                    .zip(&columns)
                    .map(|(name, values)| (name.clone(), Scalar::from(values[row])))
                    .collect(),
            )
        })
        .collect();
    DataTableResponse { data_table }
}

// =============================================================================
// Property Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(rename = "Type")]
    pub kind: i32,
    pub name: String,
    pub value: Scalar,
    pub value_epsilon: Option<f64>,
    pub sort_code: i32,
    pub row: Option<usize>,
    pub comment: String,
}

impl PropertyRecord {
    fn numeric(name: &str, value: Scalar, sort_code: i32, row: Option<usize>, comment: String) -> Self {
        Self {
            property_id: None,
            kind: NUMERIC_PROPERTY,
            name: name.to_string(),
            value,
            value_epsilon: None,
            sort_code,
            row,
            comment,
        }
    }

    fn with_property_id(mut self, id: i64) -> Self {
        self.property_id = Some(id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredicateProperty {
    #[serde(rename = "Type")]
    pub kind: i32,
    pub name: String,
    pub value: Scalar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Predicate {
    pub properties: Vec<PredicateProperty>,
}

/// Properties attached to one measurement area
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AreaComposition {
    pub predicate: Predicate,
    pub delete_previous_properties: bool,
    pub properties: Vec<PropertyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AreaPayload {
    pub compositions_for_sample_update: Vec<AreaComposition>,
    pub delete_previous_properties: bool,
    pub properties: Vec<PropertyRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OverallPayload {
    pub delete_previous_properties: bool,
    pub properties: Vec<PropertyRecord>,
}

fn t_label(extreme: Option<Extreme>) -> Scalar {
    extreme.and_then(|e| e.t_set).into()
}

/// Per-area payload: mean `R` of every area plus library-wide extremes
///
/// Extremes include negative readings, matching the per-area view.
pub fn area_payload(
    table: &NormalizedTable,
    areas: &[AreaStats],
    index: &MeasurementAreaIndex,
    expected_area_count: usize,
) -> AreaPayload {
    let temperature_dependent = table.kind().is_temperature_dependent();

    let compositions = areas
        .iter()
        .map(|area| {
            let id: Scalar = index.id_for(&area.key).map_or(Scalar::Missing, Scalar::from);
            let comment = if temperature_dependent {
                // temperature of the area's lowest reading
                let area_min = extremes(table, &rows_of(table, &area.key)).map(|(min, _)| min);
                format!(
                    "Resistance (temperature dependant) for Measurement Area {} at T={}",
                    id,
                    t_label(area_min),
                )
            } else {
                format!("Resistance (Room Temperature) for Measurement Area {}", id)
            };

            AreaComposition {
                predicate: Predicate {
                    properties: vec![PredicateProperty {
                        kind: PREDICATE_PROPERTY,
                        name: "Measurement Area".to_string(),
                        value: id,
                    }],
                },
                delete_previous_properties: false,
                properties: vec![
                    PropertyRecord::numeric(labels::R, area.stats.mean.into(), 10, None, comment)
                        .with_property_id(0),
                ],
            }
        })
        .collect();

    let all_rows: Vec<usize> = (0..table.row_count()).collect();
    let overall = extremes(table, &all_rows);
    let (min, max) = (overall.map(|(min, _)| min), overall.map(|(_, max)| max));
    let value = |extreme: Option<Extreme>| -> Scalar { extreme.map(|e| e.value).into() };

    let records = if temperature_dependent {
        let (t_min, t_max) = temperature_bounds(table).map_or((None, None), |(lo, hi)| (Some(lo), Some(hi)));
        let as_int = |t: Option<f64>| t.map_or(Scalar::Missing, |t| Scalar::Int(t.trunc() as i64));
        vec![
            PropertyRecord::numeric(
                labels::R,
                value(min),
                10,
                Some(1),
                format!(
                    "Minimal Resistance of Materials Library (of all {} MAs) at T= {}",
                    expected_area_count,
                    t_label(min)
                ),
            ),
            PropertyRecord::numeric(
                labels::R,
                value(max),
                10,
                Some(2),
                format!(
                    "Maximal Resistance of Materials Library (of all {} MAs) at T= {}",
                    expected_area_count,
                    t_label(max)
                ),
            ),
            PropertyRecord::numeric(
                "T",
                as_int(t_min),
                10,
                Some(1),
                format!("Minimal Temperature of Materials Library (of all {} MAs)", expected_area_count),
            ),
            PropertyRecord::numeric(
                "T",
                as_int(t_max),
                10,
                Some(2),
                format!("Maximal Temperature of Materials Library (of all {} MAs)", expected_area_count),
            ),
        ]
    } else {
        vec![
            PropertyRecord::numeric(
                labels::R,
                value(min),
                10,
                Some(1),
                format!(
                    "Minimal Resistance (Room Temperature) of Materials Library (of all {} MAs)",
                    expected_area_count
                ),
            ),
            PropertyRecord::numeric(
                labels::R,
                value(max),
                10,
                Some(2),
                format!(
                    "Maximal Resistance (Room Temperature) of Materials Library (of all {} MAs)",
                    expected_area_count
                ),
            ),
        ]
    };
    let properties = records
        .into_iter()
        .map(|record| record.with_property_id(0))
        .collect();

    AreaPayload {
        compositions_for_sample_update: compositions,
        delete_previous_properties: true,
        properties,
    }
}

/// Overall payload for room-temperature files
pub fn overall_payload(stats: &ResistanceStats) -> OverallPayload {
    OverallPayload {
        delete_previous_properties: true,
        properties: vec![
            PropertyRecord::numeric("Resistance", stats.min.into(), 0, Some(1), "Minimal Resistance".into()),
            PropertyRecord::numeric("Resistance", stats.max.into(), 0, Some(2), "Maximal Resistance".into()),
        ],
    }
}

/// Overall payload for temperature-dependent files: one temperature record
/// followed by the resistance extremes at that temperature
pub fn temperature_payload(temperatures: &[TemperatureStats]) -> OverallPayload {
    let properties = temperatures
        .iter()
        .enumerate()
        .flat_map(|(i, t)| {
            let row = Some(i + 1);
            [
                PropertyRecord::numeric("Temperature", Scalar::Float(t.t_set), 10, row, "Temperature".into()),
                PropertyRecord::numeric("Resistance", t.stats.min.into(), 20, row, "Minimal Resistance".into()),
                PropertyRecord::numeric("Resistance", t.stats.max.into(), 30, row, "Maximal Resistance".into()),
            ]
        })
        .collect();

    OverallPayload {
        delete_previous_properties: true,
        properties,
    }
}
