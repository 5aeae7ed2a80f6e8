//! Per-file estimation pipeline
//!
//! measurements → identity backfill → filtering → grouping → per cell
//! (spacing → time normalization → TSWLS → grid refinement → confidence)
//! → NR beam split → tower synthesis.
//!
//! Failed cells are skipped and tallied; a file never fails as a whole.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector2;
use tracing::{debug, info, warn};

use super::preprocess::{
    expand_network_identity, filter_measurements, group_by_cell, normalize_time_offsets, select_spaced_points,
};
use crate::aggregation::TowerAggregator;
use crate::algorithms::{ConfidenceClassifier, GridSearchRefiner, PlanarProjection, TswlsEstimator};
use crate::core::{sort_records, CellGroup, EstimateRecord, MeasurementPoint, RecordKind, Technology};
use crate::utils::config::EstimatorConfig;
use crate::validation::error::{EstimationError, FailureReport};

/// NR cell ids carry the beam in their last two decimal digits
const NR_BEAM_FACTOR: u32 = 100;

/// Whether tower records are synthesized after sector estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMode {
    Sector,
    #[default]
    Tower,
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sector" => Ok(AggregationMode::Sector),
            "tower" => Ok(AggregationMode::Tower),
            other => Err(format!("unknown mode '{}' (expected sector or tower)", other)),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::Sector => f.write_str("sector"),
            AggregationMode::Tower => f.write_str("tower"),
        }
    }
}

/// Estimates of one measurement file and the cells that were skipped
#[derive(Debug, Clone)]
pub struct FileEstimate {
    /// Sectors and towers, sorted by `(channel, cellIdentity)`
    pub records: Vec<EstimateRecord>,
    pub report: FailureReport,
}

pub struct CellPipeline {
    config: EstimatorConfig,
    mode: AggregationMode,
    estimator: TswlsEstimator,
    refiner: GridSearchRefiner,
    classifier: ConfidenceClassifier,
    aggregator: TowerAggregator,
}

impl CellPipeline {
    pub fn new(config: EstimatorConfig, mode: AggregationMode) -> Self {
        let estimator = TswlsEstimator::new(config.physics.speed_of_light, config.solver.min_points);
        let refiner = GridSearchRefiner::new(
            config.physics.speed_of_light,
            config.solver.search_range_m,
            config.solver.search_step_m,
        );
        let classifier = ConfidenceClassifier::new(config.confidence.clone());
        let aggregator = TowerAggregator::new(&config.towers);
        Self {
            config,
            mode,
            estimator,
            refiner,
            classifier,
            aggregator,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn process_file(&self, points: Vec<MeasurementPoint>, technology: Technology) -> FileEstimate {
        info!("Processing {} {} measurements", points.len(), technology);

        let points = expand_network_identity(points);
        let points = filter_measurements(points, technology, &self.config.preprocessing);
        let groups = group_by_cell(points);
        debug!("{} cell groups after filtering", groups.len());

        let mut report = FailureReport::new();
        let mut sectors = Vec::with_capacity(groups.len());
        for group in &groups {
            match self.estimate_group(group, technology) {
                Ok(record) => sectors.push(record),
                Err(error) => {
                    warn!("Skipping cell {}: {}", group.key, error);
                    report.record(group.key, error);
                }
            }
        }

        if technology == Technology::Nr {
            split_nr_beams(&mut sectors);
        }
        let sector_count = sectors.len();

        let records = match self.mode {
            AggregationMode::Tower => self.aggregator.aggregate(sectors),
            AggregationMode::Sector => {
                sort_records(&mut sectors);
                sectors
            }
        };

        info!(
            "Estimated {} sectors and {} towers; {}",
            sector_count,
            records.len() - sector_count,
            report
        );
        FileEstimate { records, report }
    }

    /// Estimate a single cell from its filtered measurements
    pub fn estimate_group(&self, group: &CellGroup, technology: Technology) -> Result<EstimateRecord, EstimationError> {
        let pre = &self.config.preprocessing;
        let meters_per_degree = self.config.physics.meters_per_degree;

        let selection = select_spaced_points(&group.points, pre, meters_per_degree)?;
        let mut points = selection.points;
        normalize_time_offsets(&mut points, technology, pre);

        let Some(reference) = points.first() else {
            return Err(EstimationError::InsufficientPoints {
                available: 0,
                required: self.config.solver.min_points,
            });
        };
        let projection = PlanarProjection::new(reference.position(), meters_per_degree);
        let anchors: Vec<Vector2<f64>> = points.iter().map(|p| projection.to_local(&p.position())).collect();
        let offsets: Vec<f64> = points.iter().map(|p| p.time_offset).collect();

        let initial = self.estimator.estimate(&anchors, &offsets)?;
        let refined = self.refiner.refine(&anchors, &offsets, initial.position);
        debug!(
            "Cell {}: initial ({:.1}, {:.1}) refined ({:.1}, {:.1}) AME {:.2}",
            group.key, initial.position.x, initial.position.y, refined.position.x, refined.position.y, refined.ame
        );

        let est1 = projection.to_geodetic(&initial.position);
        let est2 = projection.to_geodetic(&refined.position);
        let confidence = self.classifier.classify(points.len(), selection.max_cinr, technology);

        let first = group.points.first();
        Ok(EstimateRecord {
            technology,
            channel: group.key.channel,
            cell_id: group.key.cell_id.to_string(),
            beam_index: None,
            kind: RecordKind::Sector,
            cell_identity: combined_identity(&group.points),
            mnc: first.and_then(|p| p.mnc.clone()).unwrap_or_default(),
            mcc: first.and_then(|p| p.mcc.clone()).unwrap_or_default(),
            x_hat1: initial.position.x,
            y_hat1: initial.position.y,
            x_hat2: refined.position.x,
            y_hat2: refined.position.y,
            est_lat1: est1.lat,
            est_lon1: est1.lon,
            est_lat2: est2.lat,
            est_lon2: est2.lon,
            max_cinr: selection.max_cinr,
            num_points: points.len(),
            confidence,
        })
    }
}

/// Distinct non-blank identities in order of appearance, joined by `-`
fn combined_identity(points: &[MeasurementPoint]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for identity in points.iter().filter_map(|p| p.cell_identity.as_deref()) {
        let identity = identity.trim();
        if !identity.is_empty() && !seen.contains(&identity) {
            seen.push(identity);
        }
    }
    seen.join("-")
}

/// Split composite NR cell ids into physical cell id and beam index
pub fn split_nr_beams(records: &mut [EstimateRecord]) {
    for record in records.iter_mut().filter(|r| r.kind == RecordKind::Sector && r.beam_index.is_none()) {
        if let Ok(composite) = record.cell_id.parse::<u32>() {
            record.cell_id = (composite / NR_BEAM_FACTOR).to_string();
            record.beam_index = Some((composite % NR_BEAM_FACTOR).to_string());
        }
    }
}
