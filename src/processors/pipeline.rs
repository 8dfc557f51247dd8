//! End-to-end analysis of one device log.
//!
//! Resolves the log to read, scans it into a measurement run, aggregates the
//! run and hands the report to the assembler.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use super::aggregate::{aggregate, AggregateReport};
use super::locator::find_latest_log_with_data;
use super::report::{ArraySink, AssemblyOutcome, ImageSink, ReportAssembler};
use crate::config::PipelineConfig;
use crate::core::loaders::{scan_file, LoaderError};
use crate::core::scanner::{LogScanner, MeasurementRun, ScanStats};

/// Errors that end an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Log source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No measurements found in {}", .0.display())]
    EmptyRun(PathBuf),

    #[error("Failed to load log: {0}")]
    Load(#[source] LoaderError),

    #[error("Invalid marker pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Everything produced by one analysis.
#[derive(Debug)]
pub struct AnalysisSummary {
    pub log_path: PathBuf,
    pub output_dir: PathBuf,
    pub stats: ScanStats,
    pub report: AggregateReport,
    pub outcome: AssemblyOutcome,
}

/// Pick the log to analyze.
///
/// An explicit path must exist. Without one, the newest log in `log_dir`
/// carrying distance frames is used.
pub fn resolve_log(explicit: Option<&Path>, log_dir: &Path, config: &PipelineConfig) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(AnalysisError::SourceUnavailable(format!(
            "log file not found: {}",
            path.display()
        ))),
        None => find_latest_log_with_data(log_dir, &config.markers.distance, &config.locator)
            .map_err(|e| AnalysisError::SourceUnavailable(e.to_string())),
    }
}

/// Artifact file name prefix for a log: its file stem.
pub fn run_label(log_path: &Path) -> String {
    log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tof".to_string())
}

/// Read and scan a log with the configured markers.
pub fn load_run(log_path: &Path, config: &PipelineConfig) -> Result<(MeasurementRun, ScanStats)> {
    let scanner = LogScanner::new(&config.markers)?;
    scan_file(log_path, &scanner).map_err(|e| match e {
        LoaderError::NotFound(path) => {
            AnalysisError::SourceUnavailable(format!("log file not found: {}", path.display()))
        }
        other => AnalysisError::Load(other),
    })
}

/// Analyze a log and write its report under `output_dir`.
///
/// Artifact failures do not end the analysis; they are returned in the
/// summary's outcome. A log without measurements produces no artifacts.
pub fn analyze_log(
    log_path: &Path,
    output_dir: &Path,
    label: &str,
    config: &PipelineConfig,
    images: &dyn ImageSink,
    arrays: &dyn ArraySink,
) -> Result<AnalysisSummary> {
    info!("Analyzing {}", log_path.display());

    let (run, stats) = load_run(log_path, config)?;
    info!(
        "Found {} measurements ({} with target status, {} without, {} discarded)",
        run.len(),
        stats.paired,
        stats.legacy,
        stats.discarded
    );

    let report = aggregate(&run).map_err(|_| AnalysisError::EmptyRun(log_path.to_path_buf()))?;

    let assembler = ReportAssembler::new(images, arrays, config.output.title_prefix.clone());
    let outcome = assembler.assemble(&report, label, output_dir);

    Ok(AnalysisSummary {
        log_path: log_path.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        stats,
        report,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::aggregate::Metric;
    use crate::processors::report::{NpyArraySink, SinkError};
    use ndarray::Array2;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingImages {
        count: Cell<usize>,
    }

    impl ImageSink for CountingImages {
        fn render(&self, _grid: &Array2<f64>, _title: &str, _metric: Metric, _path: &Path) -> std::result::Result<(), SinkError> {
            self.count.set(self.count.get() + 1);
            Ok(())
        }
    }

    fn sample_log(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let content = format!(
            "boot\nTOF: HEX DATA: \t{}\nTOF: TARGET STATUS: \t{}\nTOF: HEX DATA: \t{}\nrandom noise\n",
            "1E".repeat(64),
            "05".repeat(64),
            "32".repeat(64),
        );
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_analyze_log_writes_report() {
        let dir = TempDir::new().unwrap();
        let log = sample_log(dir.path(), "device-monitor-1.log");
        let out = dir.path().join("out");
        let images = CountingImages::default();

        let summary = analyze_log(
            &log,
            &out,
            &run_label(&log),
            &PipelineConfig::default(),
            &images,
            &NpyArraySink,
        )
        .unwrap();

        assert_eq!(summary.report.measurement_count, 2);
        assert_eq!(summary.stats.paired, 1);
        assert_eq!(summary.stats.legacy, 1);
        assert!(summary.outcome.is_complete());
        assert_eq!(images.count.get(), 3);
        assert!(out.join("device-monitor-1_distance_data.npy").exists());
        assert!(summary.report.mean_distance.iter().all(|&v| v == 40.0));
    }

    #[test]
    fn test_empty_log_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("quiet.log");
        fs::write(&log, "boot\nwifi connected\n").unwrap();
        let out = dir.path().join("out");
        let images = CountingImages::default();

        let err = analyze_log(&log, &out, "quiet", &PipelineConfig::default(), &images, &NpyArraySink)
            .unwrap_err();

        assert!(matches!(err, AnalysisError::EmptyRun(_)));
        assert_eq!(images.count.get(), 0);
        assert!(!out.exists());
    }

    #[test]
    fn test_resolve_missing_explicit_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.log");

        let err = resolve_log(Some(&missing), dir.path(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::SourceUnavailable(_)));
    }

    #[test]
    fn test_resolve_uses_locator() {
        let dir = TempDir::new().unwrap();
        let log = sample_log(dir.path(), "device-monitor-2.log");

        let resolved = resolve_log(None, dir.path(), &PipelineConfig::default()).unwrap();
        assert_eq!(resolved, log);

        let empty = TempDir::new().unwrap();
        let err = resolve_log(None, empty.path(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::SourceUnavailable(_)));
    }

    #[test]
    fn test_run_label_is_file_stem() {
        assert_eq!(run_label(Path::new("logs/device-monitor-250701.log")), "device-monitor-250701");
    }
}
