//! Core types and constants for drive-test transmitter location estimation

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
