//! Analyzer for VL53L8CH time-of-flight sensor logs.
//!
//! This crate provides tools for:
//! - Decoding 8x8 distance and target status frames from hex log lines
//! - Pairing distance and status frames found in device monitor logs
//! - Aggregating runs into per-zone mean, standard deviation and validity
//! - Rendering heatmaps and saving NumPy arrays of the results
//!
//! # Example
//!
//! ```no_run
//! use tof_log_analyzer::{core::loaders::scan_file, core::LogScanner, processors::aggregate};
//!
//! let (run, _stats) = scan_file("logs/device-monitor-250701.log", &LogScanner::default()).unwrap();
//! let report = aggregate(&run).unwrap();
//! println!("{:.1} valid zones per frame", report.valid_count_mean);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{LocatorConfig, MarkerConfig, OutputConfig, PipelineConfig, ZoneConfig};
pub use core::{Grid8x8, Measurement, MeasurementRun};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
