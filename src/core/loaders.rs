//! Loaders for device monitor logs.
//!
//! Serial monitor captures regularly contain partial UTF-8 sequences from
//! reset garbage, so invalid bytes are dropped rather than rejected. Lines may
//! end in `\n`, `\r\n` or a bare `\r`, depending on the terminal that
//! captured them.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::scanner::{LogScanner, MeasurementRun, ScanStats};

/// Errors that can occur while loading a log.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Read every line of a log file.
///
/// Invalid UTF-8 bytes are dropped rather than treated as an error. Line
/// endings (`\n`, `\r\n` or `\r`) are stripped.
///
/// # Errors
///
/// Returns [`LoaderError::NotFound`] if the path does not exist, or an IO
/// error if it cannot be read.
pub fn read_log_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }

    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    Ok(split_log_lines(&decode_log_text(&bytes)))
}

/// Decode log bytes as UTF-8, dropping invalid sequences.
fn decode_log_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, "")
}

/// Split text on `\r\n`, `\n` and bare `\r`.
///
/// A trailing terminator does not produce an empty last line.
fn split_log_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(end) => {
                lines.push(rest[..end].to_owned());
                let terminator = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + terminator..];
            }
            None => {
                lines.push(rest.to_owned());
                break;
            }
        }
    }

    lines
}

/// Load a log file and scan it into a measurement run.
pub fn scan_file<P: AsRef<Path>>(path: P, scanner: &LogScanner) -> Result<(MeasurementRun, ScanStats)> {
    let lines = read_log_lines(path)?;
    Ok(scanner.scan_with_stats(&lines))
}

/// Check whether any of the first `max_lines` lines contains `marker`.
///
/// Used to pick candidate logs without reading whole files.
pub fn sniff_marker(path: &Path, marker: &str, max_lines: usize) -> Result<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::with_capacity(256);
    let mut seen = 0;

    while seen < max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        // A chunk may hold several bare-CR lines.
        for line in split_log_lines(&decode_log_text(&buf)) {
            if seen == max_lines {
                return Ok(false);
            }
            seen += 1;
            if line.contains(marker) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}
