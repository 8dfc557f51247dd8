//! Data processing modules.

pub mod aggregate;
pub mod locator;
pub mod pipeline;
pub mod report;
pub mod zones;

// Re-export key types for convenience
pub use aggregate::{aggregate, AggregateError, AggregateReport, Metric};
pub use locator::{find_latest_log_with_data, LocatorError};
pub use pipeline::{analyze_log, resolve_log, AnalysisError, AnalysisSummary};
pub use report::{
    ArraySink, AssemblyOutcome, ImageSink, NpyArraySink, PngHeatmapSink, ReportAssembler, SinkError,
    SinkFailure,
};
pub use zones::{export_valid_zones, valid_zone_records, ZoneRecord};
