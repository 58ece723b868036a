//! Sensor processing layer.
//!
//! Turns raw range scans into point sets the matcher and map consume.

pub mod preprocessing;

pub use preprocessing::{PreprocessorConfig, ScanPreprocessor};
