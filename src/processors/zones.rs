//! Valid zone export.
//!
//! Mirrors the sensor firmware's SD card log: for every frame, one row per
//! zone whose target status is valid. Device logs carry no sensor clock, so
//! timestamps are reconstructed from the frame index and polling interval.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::core::frame::{is_valid_status, GRID_SIZE};
use crate::core::scanner::MeasurementRun;
use crate::core::writers::write_zone_csv;

/// One valid zone reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRecord {
    /// Frame index times the polling interval.
    pub timestamp_ms: u64,
    /// Zone index, `row * 8 + col`.
    pub zone_id: usize,
    /// Raw distance code.
    pub distance_mm: u8,
    /// Target status code (5 or 9).
    pub status: u8,
}

/// Collect one record per valid zone, in frame order then zone order.
///
/// Frames without target status contribute nothing.
pub fn valid_zone_records(run: &MeasurementRun, polling_interval_ms: u64) -> Vec<ZoneRecord> {
    let mut records = Vec::with_capacity(run.iter().map(|m| m.valid_count).sum());

    for (frame_idx, measurement) in run.iter().enumerate() {
        let timestamp_ms = frame_idx as u64 * polling_interval_ms;
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let status = measurement.status.get(row, col);
                if is_valid_status(status) {
                    records.push(ZoneRecord {
                        timestamp_ms,
                        zone_id: row * GRID_SIZE + col,
                        distance_mm: measurement.distance.get(row, col),
                        status,
                    });
                }
            }
        }
    }

    records
}

/// Export valid zones of a run to CSV. Returns the number of rows written.
pub fn export_valid_zones(
    run: &MeasurementRun,
    output_path: &Path,
    polling_interval_ms: u64,
) -> Result<usize> {
    let records = valid_zone_records(run, polling_interval_ms);

    write_zone_csv(output_path, &records)
        .with_context(|| format!("exporting valid zones to {}", output_path.display()))?;

    info!(
        "Wrote {} valid zone rows from {} frames to {}",
        records.len(),
        run.len(),
        output_path.display()
    );

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{Grid8x8, ZONE_COUNT};
    use crate::core::scanner::Measurement;
    use tempfile::tempdir;

    fn status_with(valid: &[(usize, u8)]) -> Grid8x8 {
        let mut bytes = [0u8; ZONE_COUNT];
        for &(zone, code) in valid {
            bytes[zone] = code;
        }
        Grid8x8::from_bytes(&bytes)
    }

    #[test]
    fn test_records_follow_frame_and_zone_order() {
        let distance = Grid8x8::from_bytes(&std::array::from_fn(|k| k as u8));
        let run = MeasurementRun::from(vec![
            Measurement::paired(distance, status_with(&[(10, 9), (2, 5), (3, 4)])),
            Measurement::legacy(distance),
            Measurement::paired(distance, status_with(&[(63, 5)])),
        ]);

        let records = valid_zone_records(&run, 200);

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            ZoneRecord {
                timestamp_ms: 0,
                zone_id: 2,
                distance_mm: 2,
                status: 5
            }
        );
        assert_eq!(records[1].zone_id, 10);
        assert_eq!(records[1].status, 9);
        assert_eq!(records[2].timestamp_ms, 400);
        assert_eq!(records[2].zone_id, 63);
        assert_eq!(records[2].distance_mm, 63);
    }

    #[test]
    fn test_export_valid_zones_writes_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zones.csv");
        let run = MeasurementRun::from(vec![Measurement::paired(
            Grid8x8::filled(100),
            Grid8x8::filled(5),
        )]);

        let rows = export_valid_zones(&run, &path, 200).unwrap();

        assert_eq!(rows, 64);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 65);
        assert!(content.lines().nth(1).unwrap().starts_with("0,0,100,5"));
    }
}
