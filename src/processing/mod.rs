//! Measurement preparation and the per-file estimation pipeline

pub mod pipeline;
pub mod preprocess;

pub use pipeline::{split_nr_beams, AggregationMode, CellPipeline, FileEstimate};
