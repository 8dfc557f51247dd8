//! Configuration types for the ToF log analyzer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Marker texts that introduce hex frames in a device log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Marker preceding a distance frame
    #[serde(default = "default_distance_marker")]
    pub distance: String,

    /// Marker preceding a target status frame
    #[serde(default = "default_status_marker")]
    pub status: String,
}

fn default_distance_marker() -> String {
    "TOF: HEX DATA:".to_string()
}

fn default_status_marker() -> String {
    "TOF: TARGET STATUS:".to_string()
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            distance: default_distance_marker(),
            status: default_status_marker(),
        }
    }
}

/// Configuration for finding the newest log with sensor data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Directory holding device monitor logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File name prefix of candidate logs
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// File extension of candidate logs (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Number of leading lines checked for a distance marker
    #[serde(default = "default_sniff_lines")]
    pub sniff_lines: usize,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "device-monitor-".to_string()
}

fn default_extension() -> String {
    "log".to_string()
}

fn default_sniff_lines() -> usize {
    100
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_prefix: default_file_prefix(),
            extension: default_extension(),
            sniff_lines: default_sniff_lines(),
        }
    }
}

/// Configuration for report artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving images and arrays
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Sensor name prefixed to plot titles
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    /// Heatmap width in pixels
    #[serde(default = "default_image_width")]
    pub image_width: u32,

    /// Heatmap height in pixels
    #[serde(default = "default_image_height")]
    pub image_height: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("vl53l8ch_analysis")
}

fn default_title_prefix() -> String {
    "VL53L8CH".to_string()
}

fn default_image_width() -> u32 {
    1000
}

fn default_image_height() -> u32 {
    800
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            title_prefix: default_title_prefix(),
            image_width: default_image_width(),
            image_height: default_image_height(),
        }
    }
}

/// Configuration for the valid zone CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Sensor polling interval used to reconstruct timestamps (5 Hz firmware default)
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

fn default_polling_interval_ms() -> u64 {
    200
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
        }
    }
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub locator: LocatorConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub zones: ZoneConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
