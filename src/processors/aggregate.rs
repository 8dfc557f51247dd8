//! Per-zone statistics over a measurement run.
//!
//! Sums are accumulated as integers per cell and converted once at the end,
//! so results do not depend on measurement order. Standard deviations use the
//! population definition (divide by N).

use ndarray::{Array2, Array3};
use thiserror::Error;

use crate::core::frame::{is_valid_status, GRID_SIZE};
use crate::core::scanner::MeasurementRun;

/// Errors that can occur during aggregation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no measurements to aggregate")]
    EmptyRun,
}

/// Aggregate grid kinds produced for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    DistanceMean,
    DistanceStd,
    Validity,
}

impl Metric {
    /// All metrics, in output order.
    pub const ALL: [Metric; 3] = [Metric::DistanceMean, Metric::DistanceStd, Metric::Validity];

    /// File name suffix for artifacts of this metric.
    pub fn suffix(self) -> &'static str {
        match self {
            Metric::DistanceMean => "distance_mean",
            Metric::DistanceStd => "distance_std",
            Metric::Validity => "validity",
        }
    }

    /// Human-readable metric name used in plot titles.
    pub fn label(self) -> &'static str {
        match self {
            Metric::DistanceMean => "Distance Mean",
            Metric::DistanceStd => "Distance Std Dev",
            Metric::Validity => "Validity Percentage",
        }
    }
}

/// Summary statistics for one measurement run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    /// Number of measurements aggregated.
    pub measurement_count: usize,
    /// Mean distance code per zone.
    pub mean_distance: Array2<f64>,
    /// Population standard deviation of the distance code per zone.
    pub std_distance: Array2<f64>,
    /// Percentage of frames reporting a valid target per zone.
    pub validity_pct: Array2<f64>,
    /// Mean number of valid zones per frame.
    pub valid_count_mean: f64,
    /// Population standard deviation of valid zones per frame.
    pub valid_count_std: f64,
    /// Raw distance frames, frames x 8 x 8.
    pub distance_stack: Array3<u8>,
    /// Raw status frames, frames x 8 x 8.
    pub status_stack: Array3<u8>,
}

impl AggregateReport {
    /// Grid for the given metric.
    pub fn grid(&self, metric: Metric) -> &Array2<f64> {
        match metric {
            Metric::DistanceMean => &self.mean_distance,
            Metric::DistanceStd => &self.std_distance,
            Metric::Validity => &self.validity_pct,
        }
    }

    /// Minimum and maximum of a metric grid.
    pub fn range(&self, metric: Metric) -> (f64, f64) {
        grid_range(self.grid(metric))
    }
}

/// Minimum and maximum value in a grid.
pub fn grid_range(grid: &Array2<f64>) -> (f64, f64) {
    grid.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Mean and population standard deviation from integer sum and sum of squares.
fn mean_std(sum: u64, sum_sq: u64, n: u64) -> (f64, f64) {
    let mean = sum as f64 / n as f64;
    // n * sum_sq - sum^2 is exact and never negative (Cauchy-Schwarz).
    let spread = n as u128 * sum_sq as u128 - sum as u128 * sum as u128;
    let variance = spread as f64 / (n as f64 * n as f64);
    (mean, variance.sqrt())
}

/// Reduce a run to per-zone mean, standard deviation and validity grids.
///
/// # Errors
///
/// Returns [`AggregateError::EmptyRun`] if the run has no measurements.
pub fn aggregate(run: &MeasurementRun) -> Result<AggregateReport, AggregateError> {
    if run.is_empty() {
        return Err(AggregateError::EmptyRun);
    }

    let n = run.len();
    let mut sum = [[0u64; GRID_SIZE]; GRID_SIZE];
    let mut sum_sq = [[0u64; GRID_SIZE]; GRID_SIZE];
    let mut valid = [[0u64; GRID_SIZE]; GRID_SIZE];
    let mut count_sum = 0u64;
    let mut count_sum_sq = 0u64;

    let mut distance_stack = Array3::<u8>::zeros((n, GRID_SIZE, GRID_SIZE));
    let mut status_stack = Array3::<u8>::zeros((n, GRID_SIZE, GRID_SIZE));

    for (frame, measurement) in run.iter().enumerate() {
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let d = measurement.distance.get(row, col);
                let s = measurement.status.get(row, col);

                sum[row][col] += d as u64;
                sum_sq[row][col] += d as u64 * d as u64;
                if is_valid_status(s) {
                    valid[row][col] += 1;
                }

                distance_stack[[frame, row, col]] = d;
                status_stack[[frame, row, col]] = s;
            }
        }

        let count = measurement.valid_count as u64;
        count_sum += count;
        count_sum_sq += count * count;
    }

    let n_u64 = n as u64;
    let mut mean_distance = Array2::<f64>::zeros((GRID_SIZE, GRID_SIZE));
    let mut std_distance = Array2::<f64>::zeros((GRID_SIZE, GRID_SIZE));
    let mut validity_pct = Array2::<f64>::zeros((GRID_SIZE, GRID_SIZE));

    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let (mean, std) = mean_std(sum[row][col], sum_sq[row][col], n_u64);
            mean_distance[[row, col]] = mean;
            std_distance[[row, col]] = std;
            validity_pct[[row, col]] = valid[row][col] as f64 / n as f64 * 100.0;
        }
    }

    let (valid_count_mean, valid_count_std) = mean_std(count_sum, count_sum_sq, n_u64);

    Ok(AggregateReport {
        measurement_count: n,
        mean_distance,
        std_distance,
        validity_pct,
        valid_count_mean,
        valid_count_std,
        distance_stack,
        status_stack,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{Grid8x8, ZONE_COUNT};
    use crate::core::scanner::Measurement;

    fn ramp(offset: u8) -> Grid8x8 {
        Grid8x8::from_bytes(&std::array::from_fn(|k| offset.wrapping_add(k as u8)))
    }

    #[test]
    fn test_empty_run_is_rejected() {
        assert_eq!(
            aggregate(&MeasurementRun::new()).unwrap_err(),
            AggregateError::EmptyRun
        );
    }

    #[test]
    fn test_single_measurement() {
        let distance = ramp(7);
        let run = MeasurementRun::from(vec![Measurement::paired(distance, Grid8x8::filled(5))]);

        let report = aggregate(&run).unwrap();

        assert_eq!(report.measurement_count, 1);
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                assert_eq!(report.mean_distance[[row, col]], distance.get(row, col) as f64);
                assert_eq!(report.std_distance[[row, col]], 0.0);
                assert_eq!(report.validity_pct[[row, col]], 100.0);
            }
        }
        assert_eq!(report.valid_count_mean, 64.0);
        assert_eq!(report.valid_count_std, 0.0);
        assert_eq!(report.distance_stack.shape(), &[1, 8, 8]);
    }

    #[test]
    fn test_population_std() {
        // Values 2 and 4: population std is 1, sample std would be sqrt(2).
        let run = MeasurementRun::from(vec![
            Measurement::legacy(Grid8x8::filled(2)),
            Measurement::legacy(Grid8x8::filled(4)),
        ]);

        let report = aggregate(&run).unwrap();

        assert!(report.mean_distance.iter().all(|&v| v == 3.0));
        assert!(report.std_distance.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_legacy_only_run_has_zero_validity() {
        let run: MeasurementRun = (0..4).map(|k| Measurement::legacy(ramp(k))).collect();

        let report = aggregate(&run).unwrap();

        assert!(report.validity_pct.iter().all(|&v| v == 0.0));
        assert_eq!(report.valid_count_mean, 0.0);
        assert_eq!(report.valid_count_std, 0.0);
        assert!(report.status_stack.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_validity_percentage_per_zone() {
        let mut status = [0u8; ZONE_COUNT];
        status[0] = 5;
        status[1] = 9;
        status[2] = 4;
        let with_status = Grid8x8::from_bytes(&status);
        let run = MeasurementRun::from(vec![
            Measurement::paired(Grid8x8::zeros(), with_status),
            Measurement::paired(Grid8x8::zeros(), Grid8x8::filled(9)),
            Measurement::legacy(Grid8x8::zeros()),
            Measurement::paired(Grid8x8::zeros(), with_status),
        ]);

        let report = aggregate(&run).unwrap();

        assert_eq!(report.validity_pct[[0, 0]], 75.0);
        assert_eq!(report.validity_pct[[0, 1]], 75.0);
        assert_eq!(report.validity_pct[[0, 2]], 25.0);
        assert_eq!(report.validity_pct[[7, 7]], 25.0);

        // Valid counts 2, 64, 0, 2.
        assert_eq!(report.valid_count_mean, 17.0);
        let expected_std = ((15.0f64.powi(2) * 2.0 + 47.0f64.powi(2) + 17.0f64.powi(2)) / 4.0).sqrt();
        assert!((report.valid_count_std - expected_std).abs() < 1e-9);
    }

    #[test]
    fn test_order_independence() {
        let measurements: Vec<Measurement> = (0..6)
            .map(|k| Measurement::paired(ramp(k * 37), Grid8x8::filled(if k % 2 == 0 { 5 } else { 1 })))
            .collect();
        let mut reversed = measurements.clone();
        reversed.reverse();
        let mut rotated = measurements.clone();
        rotated.rotate_left(2);

        let a = aggregate(&MeasurementRun::from(measurements)).unwrap();
        let b = aggregate(&MeasurementRun::from(reversed)).unwrap();
        let c = aggregate(&MeasurementRun::from(rotated)).unwrap();

        for metric in Metric::ALL {
            assert_eq!(a.grid(metric), b.grid(metric));
            assert_eq!(a.grid(metric), c.grid(metric));
        }
        assert_eq!(a.valid_count_mean, b.valid_count_mean);
        assert_eq!(a.valid_count_std, c.valid_count_std);
    }

    #[test]
    fn test_stacks_keep_log_order() {
        let run = MeasurementRun::from(vec![
            Measurement::paired(Grid8x8::filled(1), Grid8x8::filled(9)),
            Measurement::legacy(Grid8x8::filled(2)),
        ]);

        let report = aggregate(&run).unwrap();

        assert_eq!(report.distance_stack[[0, 3, 3]], 1);
        assert_eq!(report.distance_stack[[1, 3, 3]], 2);
        assert_eq!(report.status_stack[[0, 0, 0]], 9);
        assert_eq!(report.status_stack[[1, 0, 0]], 0);
    }

    #[test]
    fn test_range() {
        let run = MeasurementRun::from(vec![Measurement::legacy(ramp(10))]);
        let report = aggregate(&run).unwrap();
        assert_eq!(report.range(Metric::DistanceMean), (10.0, 73.0));
        assert_eq!(report.range(Metric::Validity), (0.0, 0.0));
    }
}
