//! Locating the newest device log that carries sensor frames.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::LocatorConfig;
use crate::core::loaders::sniff_marker;

/// Errors that can occur while locating a log.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("No log files found in {0}")]
    NoLogFiles(PathBuf),

    #[error("No log files with sensor data found in {0}")]
    NoDataFound(PathBuf),
}

/// List candidate logs in `dir`, newest modification time first.
///
/// Candidates are files whose name starts with the configured prefix and
/// whose extension matches. Ties are broken by path for a stable order.
pub fn candidate_logs(dir: &Path, config: &LocatorConfig) -> Vec<PathBuf> {
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name_ok = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&config.file_prefix))
                .unwrap_or(false);
            let ext_ok = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(&config.extension))
                .unwrap_or(false);
            name_ok && ext_ok
        })
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    logs.into_iter().map(|(_, path)| path).collect()
}

/// Find the newest log in `dir` whose leading lines contain `marker`.
///
/// Candidates are checked in parallel; the newest matching one wins.
///
/// # Errors
///
/// Returns an error if the directory is missing, holds no candidate logs, or
/// none of them mention the marker.
pub fn find_latest_log_with_data(dir: &Path, marker: &str, config: &LocatorConfig) -> Result<PathBuf, LocatorError> {
    if !dir.is_dir() {
        return Err(LocatorError::DirectoryNotFound(dir.to_path_buf()));
    }

    let candidates = candidate_logs(dir, config);
    if candidates.is_empty() {
        return Err(LocatorError::NoLogFiles(dir.to_path_buf()));
    }
    debug!("{} candidate logs in {}", candidates.len(), dir.display());

    let has_data: Vec<bool> = candidates
        .par_iter()
        .map(|path| match sniff_marker(path, marker, config.sniff_lines) {
            Ok(found) => found,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                false
            }
        })
        .collect();

    candidates
        .into_iter()
        .zip(has_data)
        .find_map(|(path, found)| found.then_some(path))
        .map(|path| {
            info!("Found sensor data in: {}", path.display());
            path
        })
        .ok_or_else(|| LocatorError::NoDataFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    const MARKER: &str = "TOF: HEX DATA:";

    fn write_log(dir: &Path, name: &str, with_data: bool, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "--- Terminal on COM3 | 115200 8-N-1").unwrap();
        if with_data {
            writeln!(file, "{} \t{}", MARKER, "00".repeat(64)).unwrap();
        }
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
        path
    }

    #[test]
    fn test_picks_newest_log_with_data() {
        let dir = TempDir::new().unwrap();
        write_log(dir.path(), "device-monitor-250701-100000.log", true, 300);
        let expected = write_log(dir.path(), "device-monitor-250702-100000.log", true, 200);
        write_log(dir.path(), "device-monitor-250703-100000.log", false, 100);
        write_log(dir.path(), "other-250704.log", true, 10);
        write_log(dir.path(), "device-monitor-250705.txt", true, 10);

        let found = find_latest_log_with_data(dir.path(), MARKER, &LocatorConfig::default()).unwrap();

        assert_eq!(found, expected);
    }

    #[test]
    fn test_candidates_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let old = write_log(dir.path(), "device-monitor-a.log", false, 500);
        let new = write_log(dir.path(), "device-monitor-b.log", false, 5);

        let logs = candidate_logs(dir.path(), &LocatorConfig::default());

        assert_eq!(logs, vec![new, old]);
    }

    #[test]
    fn test_no_data_found() {
        let dir = TempDir::new().unwrap();
        write_log(dir.path(), "device-monitor-1.log", false, 0);

        let err = find_latest_log_with_data(dir.path(), MARKER, &LocatorConfig::default()).unwrap_err();
        assert!(matches!(err, LocatorError::NoDataFound(_)));
    }

    #[test]
    fn test_no_log_files_and_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = find_latest_log_with_data(dir.path(), MARKER, &LocatorConfig::default()).unwrap_err();
        assert!(matches!(err, LocatorError::NoLogFiles(_)));

        let missing = dir.path().join("nope");
        let err = find_latest_log_with_data(&missing, MARKER, &LocatorConfig::default()).unwrap_err();
        assert!(matches!(err, LocatorError::DirectoryNotFound(_)));
    }
}
