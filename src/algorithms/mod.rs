//! Numeric core: projection, least squares solvers and refinement

pub mod confidence;
pub mod grid_search;
pub mod projection;
pub mod tswls;
pub mod wls;

pub use confidence::ConfidenceClassifier;
pub use grid_search::{GridRefinement, GridSearchRefiner};
pub use projection::{to_lat_lon, to_local_xy, PlanarProjection};
pub use tswls::{TswlsEstimator, TswlsSolution};
pub use wls::weighted_least_squares;
