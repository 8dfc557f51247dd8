//! Command-line interface for the ToF log analyzer.

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::frame::ZONE_COUNT;
use crate::processors::aggregate::{AggregateReport, Metric};
use crate::processors::pipeline::{self, AnalysisError};
use crate::processors::report::{NpyArraySink, PngHeatmapSink};
use crate::processors::{locator, zones};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "tof-log-analyzer")]
#[command(about = "VL53L8CH time-of-flight log analyzer", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    // Defaults to `analyze` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    analyze: AnalyzeArgs,
}

#[derive(Args, Debug, Default, PartialEq)]
struct AnalyzeArgs {
    /// Log file to analyze (defaults to the newest log with sensor data)
    log_file: Option<PathBuf>,
    /// Output directory for images and arrays
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Directory searched when no log file is given
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Prefix for artifact file names (defaults to the log file stem)
    #[arg(long)]
    label: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate a log into heatmaps and NumPy arrays
    Analyze(AnalyzeArgs),

    /// Print the newest log that contains sensor data
    Locate {
        /// Directory to search
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Export valid zones of a log as CSV
    ExportZones {
        /// Log file to export (defaults to the newest log with sensor data)
        log_file: Option<PathBuf>,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
        /// Directory searched when no log file is given
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Sensor polling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => {
            match PipelineConfig::from_yaml(path) {
                Ok(cfg) => {
                    info!("Loaded config from: {}", path.display());
                    cfg
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                    PipelineConfig::default()
                }
            }
        }
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command.unwrap_or(Commands::Analyze(cli.analyze)) {
        Commands::Analyze(args) => {
            cmd_analyze(args, &config);
        }
        Commands::Locate { log_dir } => {
            cmd_locate(log_dir, &config);
        }
        Commands::ExportZones { log_file, output, log_dir, interval_ms } => {
            cmd_export_zones(log_file, &output, log_dir, interval_ms, &config);
        }
    }
}

/// Resolve the log to work on, exiting with an error if there is none.
fn resolve_or_exit(log_file: Option<PathBuf>, log_dir: Option<PathBuf>, config: &PipelineConfig) -> PathBuf {
    let search_dir = log_dir.unwrap_or_else(|| config.locator.log_dir.clone());

    if log_file.is_none() {
        println!("Searching for latest log with sensor data in {}...", search_dir.display());
    }

    match pipeline::resolve_log(log_file.as_deref(), &search_dir, config) {
        Ok(path) => path,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn format_range(report: &AggregateReport, metric: Metric) -> String {
    let (lo, hi) = report.range(metric);
    format!("{:.1} - {:.1}", lo, hi)
}

fn cmd_analyze(args: AnalyzeArgs, config: &PipelineConfig) {
    let AnalyzeArgs { log_file, output_dir, log_dir, label } = args;
    let start = Instant::now();

    let log_path = resolve_or_exit(log_file, log_dir, config);
    let output_dir = output_dir.unwrap_or_else(|| config.output.output_dir.clone());
    let label = label.unwrap_or_else(|| pipeline::run_label(&log_path));

    println!("Analyzing log: {}", log_path.display());
    println!("Output directory: {}", output_dir.display());

    let spinner = create_spinner("Extracting sensor frames...");

    let images = PngHeatmapSink {
        width: config.output.image_width,
        height: config.output.image_height,
    };

    let summary = match pipeline::analyze_log(&log_path, &output_dir, &label, config, &images, &NpyArraySink) {
        Ok(summary) => {
            spinner.finish_and_clear();
            summary
        }
        Err(AnalysisError::EmptyRun(path)) => {
            spinner.finish_and_clear();
            error!("No sensor data found in {}, nothing to analyze", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Analysis failed: {}", e);
            std::process::exit(1);
        }
    };

    let report = &summary.report;
    let shape = |stack: &ndarray::Array3<u8>| format!("{:?}", stack.shape());

    print_summary(
        "Analysis Complete",
        &[
            ("Log file", log_path.display().to_string()),
            ("Measurements", report.measurement_count.to_string()),
            ("With target status", summary.stats.paired.to_string()),
            ("Discarded frames", summary.stats.discarded.to_string()),
            ("Distance data shape", shape(&report.distance_stack)),
            ("Status data shape", shape(&report.status_stack)),
            (
                "Valid zones",
                format!(
                    "{:.1} ± {:.1} (out of {})",
                    report.valid_count_mean, report.valid_count_std, ZONE_COUNT
                ),
            ),
            ("Distance mean range", format_range(report, Metric::DistanceMean)),
            ("Distance std range", format_range(report, Metric::DistanceStd)),
            ("Validity range (%)", format_range(report, Metric::Validity)),
            ("Files written", summary.outcome.written.len().to_string()),
            ("Output directory", summary.output_dir.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    if !summary.outcome.is_complete() {
        for failure in &summary.outcome.failures {
            error!("Failed to write {}", failure);
        }
        error!(
            "{} of {} artifacts could not be written",
            summary.outcome.failures.len(),
            summary.outcome.failures.len() + summary.outcome.written.len()
        );
        std::process::exit(1);
    }
}

fn cmd_locate(log_dir: Option<PathBuf>, config: &PipelineConfig) {
    let search_dir = log_dir.unwrap_or_else(|| config.locator.log_dir.clone());

    let spinner = create_spinner("Checking candidate logs...");
    let result = locator::find_latest_log_with_data(&search_dir, &config.markers.distance, &config.locator);
    spinner.finish_and_clear();

    match result {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_export_zones(
    log_file: Option<PathBuf>,
    output: &Path,
    log_dir: Option<PathBuf>,
    interval_ms: Option<u64>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    let log_path = resolve_or_exit(log_file, log_dir, config);
    let interval = interval_ms.unwrap_or(config.zones.polling_interval_ms);

    println!("Exporting valid zones from: {}", log_path.display());
    println!("Output: {}", output.display());

    let spinner = create_spinner("Extracting sensor frames...");

    let run = match pipeline::load_run(&log_path, config) {
        Ok((run, _stats)) => run,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to read log: {}", e);
            std::process::exit(1);
        }
    };

    if run.is_empty() {
        spinner.finish_and_clear();
        error!("No sensor data found in {}, nothing to export", log_path.display());
        std::process::exit(1);
    }

    match zones::export_valid_zones(&run, output, interval) {
        Ok(rows) => {
            spinner.finish_and_clear();

            print_summary(
                "Zone Export Complete",
                &[
                    ("Log file", log_path.display().to_string()),
                    ("Output CSV", output.display().to_string()),
                    ("Frames", run.len().to_string()),
                    ("Valid zone rows", rows.to_string()),
                    ("Polling interval", format!("{} ms", interval)),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Export failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
