//! Failure taxonomy and per-file failure accounting

pub mod error;

pub use error::{EstimationError, FailureReport, SolveStage};
