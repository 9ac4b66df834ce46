//! Resistance statistics.
//!
//! Per-area statistics keep negative readings so no measurement area is
//! lost; per-temperature and overall statistics discard them. Grouping runs
//! through polars lazy frames.

use crate::constants::labels;
use crate::error::{ProcessorError, Result};
use crate::table::NormalizedTable;
use polars::prelude::{DataFrame, DataType, Expr, IntoLazy, SortMultipleOptions, col};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Median, mean, min and max of `R`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResistanceStats {
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Grouping key of a measurement area
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AreaKey {
    Explicit(f64),
    Coordinate { x: f64, y: f64 },
}

impl AreaKey {
    fn matches(&self, table: &NormalizedTable, row: usize) -> bool {
        match *self {
            AreaKey::Explicit(ma) => table.value(labels::MA, row) == Some(ma),
            AreaKey::Coordinate { x, y } => {
                table.value(labels::X, row) == Some(x) && table.value(labels::Y, row) == Some(y)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaStats {
    pub key: AreaKey,
    pub stats: ResistanceStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub t_set: f64,
    pub stats: ResistanceStats,
}

/// Identifier of a measurement area in database records
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AreaId {
    /// Value of an explicit `MA` column
    Explicit(f64),
    /// 1-based position in `(y, x)` order
    Index(usize),
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaId::Explicit(ma) if ma.fract() == 0.0 && ma.abs() < 1e15 => write!(f, "{}", *ma as i64),
            AreaId::Explicit(ma) => write!(f, "{}", ma),
            AreaId::Index(p) => write!(f, "{}", p),
        }
    }
}

/// Mapping from area keys to measurement-area ids
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementAreaIndex {
    /// The table carries an `MA` column
    Explicit,
    /// Distinct coordinates in `(y, x)` order, id = position + 1
    Coordinates(Vec<(f64, f64)>),
}

impl MeasurementAreaIndex {
    pub fn id_for(&self, key: &AreaKey) -> Option<AreaId> {
        match (self, key) {
            (MeasurementAreaIndex::Explicit, AreaKey::Explicit(ma)) => Some(AreaId::Explicit(*ma)),
            (MeasurementAreaIndex::Coordinates(coords), AreaKey::Coordinate { x, y }) => coords
                .iter()
                .position(|(cx, cy)| cx == x && cy == y)
                .map(|i| AreaId::Index(i + 1)),
            _ => None,
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            MeasurementAreaIndex::Explicit => None,
            MeasurementAreaIndex::Coordinates(coords) => Some(coords.len()),
        }
    }
}

/// Distinct complete `(x, y)` pairs sorted by `(y, x)`
pub fn distinct_coordinates(table: &NormalizedTable) -> Vec<(f64, f64)> {
    let (Some(xs), Some(ys)) = (table.column(labels::X), table.column(labels::Y)) else {
        return Vec::new();
    };

    let mut coords: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    coords.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.total_cmp(&b.0)));
    coords.dedup();
    coords
}

/// Build the area index, requiring exactly `expected` coordinates when
/// areas are identified by position
pub fn area_index(table: &NormalizedTable, expected: usize) -> Result<MeasurementAreaIndex> {
    if table.has_column(labels::MA) {
        return Ok(MeasurementAreaIndex::Explicit);
    }

    let coords = distinct_coordinates(table);
    if coords.len() != expected {
        return Err(ProcessorError::AreaCountMismatch {
            expected,
            found: coords.len(),
        });
    }
    debug!("Indexed {} measurement areas by coordinate", coords.len());
    Ok(MeasurementAreaIndex::Coordinates(coords))
}

fn resistance_aggregations() -> Vec<Expr> {
    vec![
        col(labels::R).median().alias("median"),
        col(labels::R).mean().alias("mean"),
        col(labels::R).min().alias("min"),
        col(labels::R).max().alias("max"),
    ]
}

fn float_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = frame
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn stats_rows(frame: &DataFrame) -> Result<Vec<ResistanceStats>> {
    let median = float_column(frame, "median")?;
    let mean = float_column(frame, "mean")?;
    let min = float_column(frame, "min")?;
    let max = float_column(frame, "max")?;

    Ok((0..frame.height())
        .map(|i| ResistanceStats {
            median: median[i],
            mean: mean[i],
            min: min[i],
            max: max[i],
        })
        .collect())
}

/// Group `R` by the given keys, dropping rows with a missing key
fn grouped(table: &NormalizedTable, keys: &[&str], sort_keys: &[&str]) -> Result<DataFrame> {
    let present = keys
        .iter()
        .map(|key| col(*key).is_not_null())
        .reduce(|acc, expr| acc.and(expr))
        .ok_or_else(|| ProcessorError::Configuration {
            message: "grouping requires at least one key".to_string(),
        })?;

    let frame = table
        .to_frame()?
        .lazy()
        .filter(present)
        .group_by(keys.iter().map(|key| col(*key)).collect::<Vec<_>>())
        .agg(resistance_aggregations())
        .sort_by_exprs(
            sort_keys.iter().map(|key| col(*key)).collect::<Vec<_>>(),
            SortMultipleOptions::default(),
        )
        .collect()?;
    Ok(frame)
}

/// Statistics per measurement area, grouped by `MA` or else `(x, y)`
///
/// Negative readings are kept. Empty when the table has no area key.
pub fn area_stats(table: &NormalizedTable) -> Result<Vec<AreaStats>> {
    let areas: Vec<AreaStats> = if table.has_column(labels::MA) {
        let frame = grouped(table, &[labels::MA], &[labels::MA])?;
        float_column(&frame, labels::MA)?
            .into_iter()
            .zip(stats_rows(&frame)?)
            .filter_map(|(ma, stats)| {
                ma.map(|ma| AreaStats {
                    key: AreaKey::Explicit(ma),
                    stats,
                })
            })
            .collect()
    } else if table.has_column(labels::X) && table.has_column(labels::Y) {
        let frame = grouped(table, &[labels::X, labels::Y], &[labels::Y, labels::X])?;
        let xs = float_column(&frame, labels::X)?;
        let ys = float_column(&frame, labels::Y)?;
        xs.into_iter()
            .zip(ys)
            .zip(stats_rows(&frame)?)
            .filter_map(|((x, y), stats)| {
                Some(AreaStats {
                    key: AreaKey::Coordinate { x: x?, y: y? },
                    stats,
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    debug!("Aggregated resistance over {} measurement areas", areas.len());
    Ok(areas)
}

/// Statistics per set temperature, negative readings discarded
pub fn temperature_stats(table: &NormalizedTable) -> Result<Vec<TemperatureStats>> {
    let masked = table.without_negative_readings();
    let frame = grouped(&masked, &[labels::T_SET], &[labels::T_SET])?;
    let temperatures = float_column(&frame, labels::T_SET)?;
    Ok(temperatures
        .into_iter()
        .zip(stats_rows(&frame)?)
        .filter_map(|(t_set, stats)| t_set.map(|t_set| TemperatureStats { t_set, stats }))
        .collect())
}

/// Statistics over the whole file, negative readings discarded
pub fn overall_stats(table: &NormalizedTable) -> Result<ResistanceStats> {
    let masked = table.without_negative_readings();
    let frame = masked.to_frame()?.lazy().select(resistance_aggregations()).collect()?;
    Ok(stats_rows(&frame)?.into_iter().next().unwrap_or_default())
}

/// A resistance extreme and the set temperature of its first occurrence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extreme {
    pub value: f64,
    pub t_set: Option<f64>,
}

fn extreme_in<F>(table: &NormalizedTable, rows: &[usize], better: F) -> Option<Extreme>
where
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<(f64, usize)> = None;
    for &row in rows {
        if let Some(value) = table.value(labels::R, row) {
            if best.is_none_or(|(current, _)| better(value, current)) {
                best = Some((value, row));
            }
        }
    }
    best.map(|(value, row)| Extreme {
        value,
        t_set: table.value(labels::T_SET, row),
    })
}

/// Minimum and maximum `R` over the given rows, negative readings kept
pub fn extremes(table: &NormalizedTable, rows: &[usize]) -> Option<(Extreme, Extreme)> {
    Some((
        extreme_in(table, rows, |value, current| value < current)?,
        extreme_in(table, rows, |value, current| value > current)?,
    ))
}

/// Row indices belonging to one measurement area
pub fn rows_of(table: &NormalizedTable, key: &AreaKey) -> Vec<usize> {
    (0..table.row_count()).filter(|&row| key.matches(table, row)).collect()
}

/// Minimum and maximum of the `T_set` column
pub fn temperature_bounds(table: &NormalizedTable) -> Option<(f64, f64)> {
    let values = table.column(labels::T_SET)?.iter().flatten().copied();
    Some((values.clone().reduce(f64::min)?, values.reduce(f64::max)?))
}
