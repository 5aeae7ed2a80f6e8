//! Grouping of per-sector estimates into towers and clusters

pub mod dbscan;
pub mod selection;
pub mod tower;

pub use dbscan::DensityClusterer;
pub use selection::{select_for_clustering, ClusterField, ClusterFilter};
pub use tower::TowerAggregator;
