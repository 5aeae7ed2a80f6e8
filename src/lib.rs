//! Cellular transmitter location from drive-test timing
//!
//! Estimates the position of each measured sector with three-stage weighted
//! least squares multilateration and a greedy grid refinement, then groups the
//! sector estimates into tower summaries and density clusters.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod aggregation;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use self::core::{
    CellGroup, CellKey, ClusterRecord, Confidence, EstimateRecord, MeasurementPoint, Position, RecordKind, Technology,
};
pub use algorithms::{ConfidenceClassifier, GridSearchRefiner, PlanarProjection, TswlsEstimator};
pub use processing::{AggregationMode, CellPipeline, FileEstimate};
pub use aggregation::{select_for_clustering, ClusterFilter, DensityClusterer, TowerAggregator};
pub use validation::{EstimationError, FailureReport};
pub use utils::{ConfigError, EstimatorConfig};
pub use api::{read_measurements, write_clusters, write_estimates, RecordIoError};
