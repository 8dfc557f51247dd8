//! Core data types and I/O operations.

pub mod frame;
pub mod loaders;
pub mod scanner;
pub mod writers;

pub use frame::{decode_hex_frame, Grid8x8, MalformedFrame};
pub use loaders::LoaderError;
pub use scanner::{LogScanner, Measurement, MeasurementRun, ScanStats};
pub use writers::{write_npy_grid, write_npy_stack, write_zone_csv, WriteError};
