//! Record file I/O

pub mod formatting;
pub mod input;

pub use formatting::{write_clusters, write_estimates, RecordIoError};
pub use input::read_measurements;
