//! Data writers for NumPy arrays and zone CSV exports.
//!
//! This module provides functions for writing analysis output:
//! - `.npy` files for stacked raw frames (frames x 8 x 8, `u8`)
//! - `.npy` files for aggregate grids (8 x 8, `f64`)
//! - CSV rows of valid zone readings, in the firmware's SD card layout

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, Array3};
use ndarray_npy::{WriteNpyError, WriteNpyExt};
use thiserror::Error;

use crate::processors::zones::ZoneRecord;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// NPY encoding error.
    #[error("NPY write error for '{path}': {source}")]
    Npy {
        path: String,
        #[source]
        source: WriteNpyError,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
pub(crate) fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Write a stack of raw frames (frames x 8 x 8) as a `.npy` file.
///
/// # Errors
///
/// Returns an error if parent directories or the file cannot be created, or
/// the array cannot be encoded.
pub fn write_npy_stack(path: &Path, frames: &Array3<u8>) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;

    frames.write_npy(&mut writer).map_err(|e| WriteError::Npy {
        path: path.display().to_string(),
        source: e,
    })?;

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write an aggregate grid as a `.npy` file of `f64`.
///
/// # Errors
///
/// Returns an error if parent directories or the file cannot be created, or
/// the array cannot be encoded.
pub fn write_npy_grid(path: &Path, grid: &Array2<f64>) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;

    grid.write_npy(&mut writer).map_err(|e| WriteError::Npy {
        path: path.display().to_string(),
        source: e,
    })?;

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write valid zone readings to CSV.
///
/// Creates a CSV file with headers `timestamp_ms,zone_id,distance_mm,status`
/// and one row per record.
///
/// # Example
///
/// ```no_run
/// use tof_log_analyzer::core::writers::write_zone_csv;
/// use tof_log_analyzer::processors::zones::ZoneRecord;
/// use std::path::Path;
///
/// let rows = vec![ZoneRecord { timestamp_ms: 0, zone_id: 3, distance_mm: 120, status: 5 }];
/// write_zone_csv(Path::new("tof_log.csv"), &rows).unwrap();
/// ```
pub fn write_zone_csv(path: &Path, records: &[ZoneRecord]) -> Result<()> {
    ensure_parent_dirs(path)?;

    let buf_writer = create_buffered_writer(path)?;
    let mut csv_writer = csv::Writer::from_writer(buf_writer);

    let path_str = path.display().to_string();

    csv_writer
        .write_record(["timestamp_ms", "zone_id", "distance_mm", "status"])
        .map_err(|e| WriteError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

    for record in records {
        csv_writer
            .write_record(&[
                record.timestamp_ms.to_string(),
                record.zone_id.to_string(),
                record.distance_mm.to_string(),
                record.status.to_string(),
            ])
            .map_err(|e| WriteError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}
