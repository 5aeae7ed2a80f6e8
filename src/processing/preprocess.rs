//! Measurement preparation ahead of estimation
//!
//! Identity backfill, validity filtering, grouping by cell, spatial
//! down-sampling and time offset normalization.

use std::collections::{BTreeMap, HashMap};

use crate::core::{CellGroup, CellKey, MeasurementPoint, Technology};
use crate::utils::config::PreprocessingConfig;
use crate::validation::error::EstimationError;

/// Points kept by [`select_spaced_points`] and their strongest signal
#[derive(Debug, Clone)]
pub struct SpacedSelection {
    pub points: Vec<MeasurementPoint>,
    pub max_cinr: f64,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn is_valid_network_code(value: &Option<String>) -> bool {
    !is_blank(value) && value.as_deref().map(str::trim) != Some("0")
}

/// Backfill network identity within each cell.
///
/// mcc/mnc come from the first row of the cell where both are set and non-zero.
/// `cell_identity` is forward-filled in input order.
pub fn expand_network_identity(mut points: Vec<MeasurementPoint>) -> Vec<MeasurementPoint> {
    let mut rows_by_cell: HashMap<CellKey, Vec<usize>> = HashMap::new();
    for (index, point) in points.iter().enumerate() {
        rows_by_cell.entry(point.key()).or_default().push(index);
    }

    for rows in rows_by_cell.values() {
        let reference = rows
            .iter()
            .map(|&i| &points[i])
            .find(|p| is_valid_network_code(&p.mcc) && is_valid_network_code(&p.mnc))
            .map(|p| (p.mcc.clone(), p.mnc.clone()));
        if let Some((mcc, mnc)) = reference {
            for &i in rows {
                points[i].mcc = mcc.clone();
                points[i].mnc = mnc.clone();
            }
        }

        let mut last_identity: Option<String> = None;
        for &i in rows {
            if is_blank(&points[i].cell_identity) {
                if last_identity.is_some() {
                    points[i].cell_identity = last_identity.clone();
                }
            } else {
                last_identity = points[i].cell_identity.clone();
            }
        }
    }

    points
}

/// Drop unusable rows, then drop cells left with too few samples
pub fn filter_measurements(
    points: Vec<MeasurementPoint>,
    technology: Technology,
    cfg: &PreprocessingConfig,
) -> Vec<MeasurementPoint> {
    let threshold = cfg.signal_threshold(technology);
    let kept: Vec<MeasurementPoint> = points
        .into_iter()
        .filter(|p| p.latitude != 0.0 && p.longitude != 0.0)
        .filter(|p| p.cinr >= threshold)
        .collect();

    let mut counts: HashMap<CellKey, usize> = HashMap::new();
    for point in &kept {
        *counts.entry(point.key()).or_insert(0) += 1;
    }

    kept.into_iter()
        .filter(|p| counts.get(&p.key()).copied().unwrap_or(0) >= cfg.min_cell_samples)
        .collect()
}

/// Group points by cell in ascending `CellKey` order; points keep input order
pub fn group_by_cell(points: Vec<MeasurementPoint>) -> Vec<CellGroup> {
    let mut groups: BTreeMap<CellKey, Vec<MeasurementPoint>> = BTreeMap::new();
    for point in points {
        groups.entry(point.key()).or_default().push(point);
    }
    groups
        .into_iter()
        .map(|(key, points)| CellGroup { key, points })
        .collect()
}

/// Greedy spatial thinning of one cell's points.
///
/// A point closer than `point_spacing_m` to the last kept point replaces it
/// only when its CINR is strictly higher. At most `max_points` are kept.
pub fn select_spaced_points(
    points: &[MeasurementPoint],
    cfg: &PreprocessingConfig,
    meters_per_degree: f64,
) -> Result<SpacedSelection, EstimationError> {
    let Some(first) = points.first() else {
        return Ok(SpacedSelection {
            points: Vec::new(),
            max_cinr: f64::NEG_INFINITY,
        });
    };

    let mut selected = vec![first.clone()];
    for point in &points[1..] {
        if selected.len() >= cfg.max_points {
            break;
        }
        let Some(last) = selected.last_mut() else {
            break;
        };
        let distance = (point.latitude - last.latitude).hypot(point.longitude - last.longitude) * meters_per_degree;
        if distance < cfg.point_spacing_m {
            if point.cinr > last.cinr {
                *last = point.clone();
            }
        } else {
            selected.push(point.clone());
        }
    }

    if selected.len() > 1 && selected.iter().all(|p| p.time_offset == selected[0].time_offset) {
        return Err(EstimationError::DegenerateTiming { distinct_offsets: 1 });
    }

    let max_cinr = selected.iter().map(|p| p.cinr).fold(f64::NEG_INFINITY, f64::max);
    Ok(SpacedSelection {
        points: selected,
        max_cinr,
    })
}

/// Undo wrap-around of raw timing ticks and convert them to seconds
pub fn normalize_time_offsets(points: &mut [MeasurementPoint], technology: Technology, cfg: &PreprocessingConfig) {
    if points.is_empty() {
        return;
    }
    let (rate, wrap) = cfg.timing_for(technology);

    let min = points.iter().map(|p| p.time_offset).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.time_offset).fold(f64::NEG_INFINITY, f64::max);
    let upper = 0.75 * wrap;
    if min < 0.25 * wrap && max > upper {
        for point in points.iter_mut().filter(|p| p.time_offset > upper) {
            point.time_offset -= wrap;
        }
    }

    for point in points.iter_mut() {
        point.time_offset /= rate;
    }
}
