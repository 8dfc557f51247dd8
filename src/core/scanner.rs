//! Log scanning and distance/status frame correlation.
//!
//! Device logs interleave arbitrary firmware output with pairs of lines like
//!
//! ```text
//! TOF: HEX DATA: 	0A0B0C...
//! TOF: TARGET STATUS: 	0505090...
//! ```
//!
//! A distance line is paired with a status line only when the status line
//! immediately follows it. Distance lines without a status line still produce
//! a measurement, with an all-zero (unknown) status grid.

use log::{debug, warn};
use regex::Regex;

use super::frame::{decode_hex_frame, Grid8x8, HEX_FRAME_LEN};
use crate::config::MarkerConfig;

/// One correlated distance/status frame pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    /// Raw distance code per zone.
    pub distance: Grid8x8,
    /// Target status code per zone. All zero when no status line was found.
    pub status: Grid8x8,
    /// Number of zones with status 5 or 9.
    pub valid_count: usize,
}

impl Measurement {
    /// Creates a measurement from a paired distance and status frame.
    pub fn paired(distance: Grid8x8, status: Grid8x8) -> Self {
        Self {
            distance,
            status,
            valid_count: status.valid_count(),
        }
    }

    /// Creates a measurement for a distance frame with no status line.
    pub fn legacy(distance: Grid8x8) -> Self {
        Self {
            distance,
            status: Grid8x8::zeros(),
            valid_count: 0,
        }
    }

    /// Returns true if this record carries no status information.
    #[inline]
    pub fn is_legacy(&self) -> bool {
        self.status.is_all_zero()
    }
}

/// Measurements in the order they appear in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementRun {
    measurements: Vec<Measurement>,
}

impl MeasurementRun {
    /// Creates an empty run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a measurement.
    #[inline]
    pub fn push(&mut self, measurement: Measurement) {
        self.measurements.push(measurement);
    }

    /// Number of measurements.
    #[inline]
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Returns true if no measurement was found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Measurements in log order.
    #[inline]
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Iterates measurements in log order.
    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }
}

impl From<Vec<Measurement>> for MeasurementRun {
    fn from(measurements: Vec<Measurement>) -> Self {
        Self { measurements }
    }
}

impl FromIterator<Measurement> for MeasurementRun {
    fn from_iter<I: IntoIterator<Item = Measurement>>(iter: I) -> Self {
        Self {
            measurements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MeasurementRun {
    type Item = &'a Measurement;
    type IntoIter = std::slice::Iter<'a, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.measurements.iter()
    }
}

/// Counters collected while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lines examined as potential distance lines.
    pub lines_examined: usize,
    /// Distance tokens found.
    pub distance_matches: usize,
    /// Measurements with a status frame.
    pub paired: usize,
    /// Measurements without a status frame.
    pub legacy: usize,
    /// Candidates dropped because a token failed to decode.
    pub discarded: usize,
}

/// Compiled marker patterns for distance and status lines.
#[derive(Debug, Clone)]
pub struct LogScanner {
    distance_pattern: Regex,
    status_pattern: Regex,
}

impl LogScanner {
    /// Builds a scanner for the given marker texts.
    ///
    /// Markers are matched verbatim, followed by whitespace and 128 hex digits.
    pub fn new(markers: &MarkerConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            distance_pattern: frame_pattern(&markers.distance)?,
            status_pattern: frame_pattern(&markers.status)?,
        })
    }

    /// Scan log lines into a measurement run.
    pub fn scan<S: AsRef<str>>(&self, lines: &[S]) -> MeasurementRun {
        self.scan_with_stats(lines).0
    }

    /// Scan log lines, also returning counters about what was matched.
    ///
    /// Every line except the last is examined as a potential distance line,
    /// including lines already consumed as the status line of the previous
    /// distance line.
    pub fn scan_with_stats<S: AsRef<str>>(&self, lines: &[S]) -> (MeasurementRun, ScanStats) {
        let mut run = MeasurementRun::new();
        let mut stats = ScanStats::default();

        for (i, pair) in lines.windows(2).enumerate() {
            stats.lines_examined += 1;

            let Some(distance_hex) = self.distance_token(pair[0].as_ref()) else {
                continue;
            };
            stats.distance_matches += 1;

            match self.status_token(pair[1].as_ref()) {
                Some(status_hex) => {
                    let decoded = decode_hex_frame(distance_hex)
                        .and_then(|d| decode_hex_frame(status_hex).map(|s| (d, s)));
                    match decoded {
                        Ok((distance, status)) => {
                            let measurement = Measurement::paired(distance, status);
                            debug!(
                                "line {}: paired frame, {} valid zones",
                                i + 1,
                                measurement.valid_count
                            );
                            run.push(measurement);
                            stats.paired += 1;
                        }
                        Err(e) => {
                            warn!("Skipping invalid hex data at line {}: {}", i + 1, e);
                            stats.discarded += 1;
                        }
                    }
                }
                None => match decode_hex_frame(distance_hex) {
                    Ok(distance) => {
                        debug!("line {}: distance frame without target status", i + 1);
                        run.push(Measurement::legacy(distance));
                        stats.legacy += 1;
                    }
                    Err(e) => {
                        warn!("Skipping invalid hex data at line {}: {}", i + 1, e);
                        stats.discarded += 1;
                    }
                },
            }
        }

        (run, stats)
    }

    fn distance_token<'a>(&self, line: &'a str) -> Option<&'a str> {
        capture_token(&self.distance_pattern, line)
    }

    fn status_token<'a>(&self, line: &'a str) -> Option<&'a str> {
        capture_token(&self.status_pattern, line)
    }
}

impl Default for LogScanner {
    fn default() -> Self {
        // Escaped literal markers always form a valid pattern.
        Self::new(&MarkerConfig::default()).expect("default marker patterns compile")
    }
}

fn frame_pattern(marker: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"{}\s+([0-9A-Fa-f]{{{}}})",
        regex::escape(marker),
        HEX_FRAME_LEN
    ))
}

fn capture_token<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
