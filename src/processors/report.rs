//! Report assembly: heatmap images and NumPy arrays for an aggregate report.
//!
//! Rendering and persistence sit behind the [`ImageSink`] and [`ArraySink`]
//! traits. Every artifact is attempted even when earlier ones fail; failures
//! are collected and returned with the list of written paths.

use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::{Array2, Array3};
use thiserror::Error;

use super::aggregate::{AggregateReport, Metric};
use crate::core::writers::{self, WriteError};
use crate::visualization::{self, HeatmapStyle, VisualizationError};

/// Error from a single sink call.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Render(#[from] VisualizationError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("{0}")]
    Other(String),
}

/// A failed artifact and the reason.
#[derive(Debug, Error)]
#[error("{}: {error}", .artifact.display())]
pub struct SinkFailure {
    pub artifact: PathBuf,
    #[source]
    pub error: SinkError,
}

/// Renders an 8x8 grid to an image file.
pub trait ImageSink {
    fn render(&self, grid: &Array2<f64>, title: &str, metric: Metric, path: &Path) -> Result<(), SinkError>;
}

/// Persists numeric arrays to disk.
pub trait ArraySink {
    fn persist_stack(&self, frames: &Array3<u8>, path: &Path) -> Result<(), SinkError>;
    fn persist_grid(&self, grid: &Array2<f64>, path: &Path) -> Result<(), SinkError>;
}

/// PNG heatmaps drawn with plotters.
#[derive(Debug, Clone)]
pub struct PngHeatmapSink {
    pub width: u32,
    pub height: u32,
}

impl Default for PngHeatmapSink {
    fn default() -> Self {
        Self {
            width: visualization::DEFAULT_WIDTH,
            height: visualization::DEFAULT_HEIGHT,
        }
    }
}

impl ImageSink for PngHeatmapSink {
    fn render(&self, grid: &Array2<f64>, title: &str, metric: Metric, path: &Path) -> Result<(), SinkError> {
        let style = HeatmapStyle {
            width: self.width,
            height: self.height,
            palette: metric.into(),
        };
        visualization::plot_heatmap(path, grid, title, &style)?;
        Ok(())
    }
}

/// `.npy` files written with ndarray-npy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpyArraySink;

impl ArraySink for NpyArraySink {
    fn persist_stack(&self, frames: &Array3<u8>, path: &Path) -> Result<(), SinkError> {
        writers::write_npy_stack(path, frames)?;
        Ok(())
    }

    fn persist_grid(&self, grid: &Array2<f64>, path: &Path) -> Result<(), SinkError> {
        writers::write_npy_grid(path, grid)?;
        Ok(())
    }
}

/// Paths written and failures collected while assembling a report.
#[derive(Debug, Default)]
pub struct AssemblyOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<SinkFailure>,
}

impl AssemblyOutcome {
    /// Returns true if every artifact was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, artifact: PathBuf, result: Result<(), SinkError>) {
        match result {
            Ok(()) => {
                info!("Saved {}", artifact.display());
                self.written.push(artifact);
            }
            Err(error) => {
                warn!("Failed to write {}: {}", artifact.display(), error);
                self.failures.push(SinkFailure { artifact, error });
            }
        }
    }
}

/// Drives the image and array sinks for one report.
pub struct ReportAssembler<'a> {
    images: &'a dyn ImageSink,
    arrays: &'a dyn ArraySink,
    title_prefix: String,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(images: &'a dyn ImageSink, arrays: &'a dyn ArraySink, title_prefix: impl Into<String>) -> Self {
        Self {
            images,
            arrays,
            title_prefix: title_prefix.into(),
        }
    }

    /// Plot title for a metric, e.g. `VL53L8CH Distance Mean (12 measurements)`.
    pub fn title(&self, metric: Metric, measurement_count: usize) -> String {
        format!(
            "{} {} ({} measurements)",
            self.title_prefix,
            metric.label(),
            measurement_count
        )
    }

    /// Emit three heatmaps and five arrays under `output_dir`.
    ///
    /// Image paths are `{label}_{metric}.png`; arrays are
    /// `{label}_distance_data.npy`, `{label}_target_status_data.npy` and
    /// `{label}_{metric}.npy`.
    pub fn assemble(&self, report: &AggregateReport, run_label: &str, output_dir: &Path) -> AssemblyOutcome {
        let mut outcome = AssemblyOutcome::default();

        for metric in Metric::ALL {
            let path = artifact_path(output_dir, run_label, metric.suffix(), "png");
            let title = self.title(metric, report.measurement_count);
            let result = self.images.render(report.grid(metric), &title, metric, &path);
            outcome.record(path, result);
        }

        let path = artifact_path(output_dir, run_label, "distance_data", "npy");
        let result = self.arrays.persist_stack(&report.distance_stack, &path);
        outcome.record(path, result);

        let path = artifact_path(output_dir, run_label, "target_status_data", "npy");
        let result = self.arrays.persist_stack(&report.status_stack, &path);
        outcome.record(path, result);

        for metric in Metric::ALL {
            let path = artifact_path(output_dir, run_label, metric.suffix(), "npy");
            let result = self.arrays.persist_grid(report.grid(metric), &path);
            outcome.record(path, result);
        }

        outcome
    }
}

fn artifact_path(output_dir: &Path, run_label: &str, suffix: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("{}_{}.{}", run_label, suffix, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::Grid8x8;
    use crate::core::scanner::{Measurement, MeasurementRun};
    use crate::processors::aggregate::aggregate;
    use ndarray_npy::read_npy;
    use std::cell::RefCell;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingImages {
        calls: RefCell<Vec<(String, Metric, PathBuf)>>,
    }

    impl ImageSink for RecordingImages {
        fn render(&self, _grid: &Array2<f64>, title: &str, metric: Metric, path: &Path) -> Result<(), SinkError> {
            self.calls
                .borrow_mut()
                .push((title.to_string(), metric, path.to_path_buf()));
            Ok(())
        }
    }

    struct FailingImages;

    impl ImageSink for FailingImages {
        fn render(&self, _grid: &Array2<f64>, _title: &str, _metric: Metric, _path: &Path) -> Result<(), SinkError> {
            Err(SinkError::Other("no fonts".to_string()))
        }
    }

    /// Fails only for grids, so stacks still land on disk.
    struct GridlessArrays;

    impl ArraySink for GridlessArrays {
        fn persist_stack(&self, frames: &Array3<u8>, path: &Path) -> Result<(), SinkError> {
            NpyArraySink.persist_stack(frames, path)
        }

        fn persist_grid(&self, _grid: &Array2<f64>, _path: &Path) -> Result<(), SinkError> {
            Err(SinkError::Other("disk full".to_string()))
        }
    }

    fn sample_report() -> AggregateReport {
        let run = MeasurementRun::from(vec![
            Measurement::paired(Grid8x8::filled(30), Grid8x8::filled(5)),
            Measurement::legacy(Grid8x8::filled(50)),
        ]);
        aggregate(&run).unwrap()
    }

    #[test]
    fn test_assemble_writes_all_artifacts() {
        let dir = tempdir().unwrap();
        let images = RecordingImages::default();
        let assembler = ReportAssembler::new(&images, &NpyArraySink, "VL53L8CH");

        let outcome = assembler.assemble(&sample_report(), "device-monitor-1", dir.path());

        assert!(outcome.is_complete());
        assert_eq!(outcome.written.len(), 8);

        let calls = images.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "VL53L8CH Distance Mean (2 measurements)");
        assert_eq!(calls[1].0, "VL53L8CH Distance Std Dev (2 measurements)");
        assert_eq!(calls[2].0, "VL53L8CH Validity Percentage (2 measurements)");
        assert_eq!(calls[2].1, Metric::Validity);
        assert_eq!(calls[0].2, dir.path().join("device-monitor-1_distance_mean.png"));

        let stack: Array3<u8> = read_npy(dir.path().join("device-monitor-1_distance_data.npy")).unwrap();
        assert_eq!(stack.shape(), &[2, 8, 8]);
        let status: Array3<u8> =
            read_npy(dir.path().join("device-monitor-1_target_status_data.npy")).unwrap();
        assert_eq!(status[[0, 0, 0]], 5);
        let mean: Array2<f64> = read_npy(dir.path().join("device-monitor-1_distance_mean.npy")).unwrap();
        assert!(mean.iter().all(|&v| v == 40.0));
        let std: Array2<f64> = read_npy(dir.path().join("device-monitor-1_distance_std.npy")).unwrap();
        assert!(std.iter().all(|&v| v == 10.0));
        let validity: Array2<f64> = read_npy(dir.path().join("device-monitor-1_validity.npy")).unwrap();
        assert!(validity.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn test_failures_do_not_stop_remaining_artifacts() {
        let dir = tempdir().unwrap();
        let assembler = ReportAssembler::new(&FailingImages, &GridlessArrays, "VL53L8CH");

        let outcome = assembler.assemble(&sample_report(), "run", dir.path());

        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures.len(), 6);
        assert_eq!(outcome.written.len(), 2);
        assert!(dir.path().join("run_distance_data.npy").exists());
        assert!(dir.path().join("run_target_status_data.npy").exists());
        assert_eq!(outcome.failures[0].artifact, dir.path().join("run_distance_mean.png"));
        assert_eq!(outcome.failures[5].artifact, dir.path().join("run_validity.npy"));
        assert!(outcome.failures[5].to_string().ends_with("disk full"));
    }
}
