//! Physical constants and calibration defaults

/// Propagation speed used to turn time differences into range differences (m/s)
pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Planar projection calibration, meters per degree of latitude
pub const METERS_PER_DEGREE: f64 = 111_139.0;

/// Fewest measurement points a multilateration solve will accept
pub const MIN_POINTS_FOR_ESTIMATION: usize = 4;

/// Statute miles per degree, used to express the cluster radius in degrees
pub const MILES_PER_DEGREE: f64 = 69.0;
