use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::{Technology, METERS_PER_DEGREE, MILES_PER_DEGREE, MIN_POINTS_FOR_ESTIMATION, SPEED_OF_LIGHT};

/// Grid cells per side above which a warning is raised
const LARGE_GRID_CELLS: f64 = 201.0;

/// Every tunable of the estimation run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub physics: PhysicsConfig,
    pub solver: SolverConfig,
    pub preprocessing: PreprocessingConfig,
    pub confidence: ConfidenceConfig,
    pub towers: TowerConfig,
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Propagation speed (m/s)
    pub speed_of_light: f64,
    /// Planar projection scale
    pub meters_per_degree: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Fewest points a group needs to be estimated
    pub min_points: usize,
    /// Grid search half-width (m)
    pub search_range_m: f64,
    /// Grid search spacing (m)
    pub search_step_m: f64,
}

/// Filtering, down-sampling and time normalization of raw measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub cinr_threshold: f64,
    pub ecio_threshold: f64,
    /// Groups with fewer rows after filtering are dropped
    pub min_cell_samples: usize,
    pub point_spacing_m: f64,
    pub max_points: usize,
    pub lte_sampling_rate_hz: f64,
    pub lte_wrap_value: f64,
    pub nr_sampling_multiplier: f64,
    pub nr_ssb_period_s: f64,
    pub wcdma_sampling_divisor: f64,
    pub wcdma_wrap_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub cinr_min_points: usize,
    pub cinr_min_db: f64,
    pub ecio_min_points: usize,
    pub ecio_min_db: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    /// Technologies whose sector identities also pair at ×10 spacing
    pub scaled_technologies: Vec<Technology>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub eps_miles: f64,
    pub miles_per_degree: f64,
    pub min_pts: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            speed_of_light: SPEED_OF_LIGHT,
            meters_per_degree: METERS_PER_DEGREE,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            min_points: MIN_POINTS_FOR_ESTIMATION,
            search_range_m: 600.0,
            search_step_m: 100.0,
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            cinr_threshold: 0.0,
            ecio_threshold: -12.0,
            min_cell_samples: 20,
            point_spacing_m: 100.0,
            max_points: 60,
            lte_sampling_rate_hz: 30.72e6,
            lte_wrap_value: 307_200.0,
            nr_sampling_multiplier: 4.0,
            nr_ssb_period_s: 0.020,
            wcdma_sampling_divisor: 4.0,
            wcdma_wrap_value: 38_400.0,
        }
    }
}

impl PreprocessingConfig {
    /// Tick rate (Hz) and wrap-around value (ticks) of a technology's time offsets
    pub fn timing_for(&self, technology: Technology) -> (f64, f64) {
        match technology {
            Technology::Nr => {
                let rate = self.lte_sampling_rate_hz * self.nr_sampling_multiplier;
                (rate, rate * self.nr_ssb_period_s)
            }
            Technology::Wcdma => (
                self.lte_sampling_rate_hz / self.wcdma_sampling_divisor,
                self.wcdma_wrap_value,
            ),
            Technology::Lte | Technology::Gsm => (self.lte_sampling_rate_hz, self.lte_wrap_value),
        }
    }

    /// Minimum quality metric a sample must reach
    pub fn signal_threshold(&self, technology: Technology) -> f64 {
        if technology.is_ecio_based() {
            self.ecio_threshold
        } else {
            self.cinr_threshold
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            cinr_min_points: 8,
            cinr_min_db: 12.0,
            ecio_min_points: 8,
            ecio_min_db: -10.0,
        }
    }
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            scaled_technologies: vec![Technology::Nr],
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps_miles: 0.5,
            miles_per_degree: MILES_PER_DEGREE,
            min_pts: 4,
        }
    }
}

impl ClusteringConfig {
    pub fn eps_degrees(&self) -> f64 {
        self.eps_miles / self.miles_per_degree
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value} for {parameter}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },

    #[error("configuration I/O error: {message}")]
    Io { message: String },

    #[error("configuration serialization error: {message}")]
    Serialization { message: String },
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl EstimatorConfig {
    /// Load a JSON configuration, rejecting it if validation fails
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: EstimatorConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        let validation = config.validate();
        match validation.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(config),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::Io {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.physics.speed_of_light <= 0.0 {
            errors.push(invalid(
                "speed_of_light",
                self.physics.speed_of_light,
                "Propagation speed must be positive",
            ));
        }
        if self.physics.meters_per_degree <= 0.0 {
            errors.push(invalid(
                "meters_per_degree",
                self.physics.meters_per_degree,
                "Projection scale must be positive",
            ));
        }

        if self.solver.min_points < MIN_POINTS_FOR_ESTIMATION {
            errors.push(invalid(
                "min_points",
                self.solver.min_points,
                "At least 4 points are needed to solve for x, y and the reference range",
            ));
        }
        if self.solver.search_step_m <= 0.0 {
            errors.push(invalid(
                "search_step_m",
                self.solver.search_step_m,
                "Grid step must be positive",
            ));
        }
        if self.solver.search_range_m < 0.0 {
            errors.push(invalid(
                "search_range_m",
                self.solver.search_range_m,
                "Grid range cannot be negative",
            ));
        } else if self.solver.search_step_m > 0.0
            && 2.0 * (self.solver.search_range_m / self.solver.search_step_m).ceil() + 1.0 > LARGE_GRID_CELLS
        {
            warnings.push("Very fine grid search may be slow for large files".to_string());
        }

        let pre = &self.preprocessing;
        if pre.max_points < self.solver.min_points {
            errors.push(invalid(
                "max_points",
                pre.max_points,
                "Down-sampling cap is below the estimator minimum",
            ));
        }
        if pre.min_cell_samples < self.solver.min_points {
            warnings.push("min_cell_samples below min_points lets sparse groups fail in the solver".to_string());
        }
        if pre.point_spacing_m < 0.0 {
            errors.push(invalid("point_spacing_m", pre.point_spacing_m, "Spacing cannot be negative"));
        }
        for (name, value) in [
            ("lte_sampling_rate_hz", pre.lte_sampling_rate_hz),
            ("nr_sampling_multiplier", pre.nr_sampling_multiplier),
            ("wcdma_sampling_divisor", pre.wcdma_sampling_divisor),
        ] {
            if value <= 0.0 {
                errors.push(invalid(name, value, "Sampling parameters must be positive"));
            }
        }

        if self.clustering.eps_miles <= 0.0 {
            errors.push(invalid("eps_miles", self.clustering.eps_miles, "Cluster radius must be positive"));
        }
        if self.clustering.miles_per_degree <= 0.0 {
            errors.push(invalid(
                "miles_per_degree",
                self.clustering.miles_per_degree,
                "Conversion factor must be positive",
            ));
        }
        if self.clustering.min_pts == 0 {
            errors.push(invalid("min_pts", self.clustering.min_pts, "A cluster needs at least one point"));
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
