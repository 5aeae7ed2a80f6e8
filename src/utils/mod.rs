//! Run configuration

pub mod config;

pub use config::{ConfigError, EstimatorConfig, ValidationResult};
