//! Logging and performance telemetry.
//!
//! # Logging
//!
//! All modules log through `tracing` macros with structured fields.
//! [`init_tracing`] installs the subscriber once at startup:
//!
//! ```text
//! tracing macros → EnvFilter → fmt layer → stderr | RotatingFileWriter
//! ```
//!
//! Level resolution:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `trace_level` in the configuration file
//! 3. Default: `"info"`
//!
//! When `log_file` is configured, output goes to that file, rotated at 10MB
//! with 3 backups kept.
//!
//! # Telemetry
//!
//! [`PerformanceMonitor`] collects render/API/load timings and counters and
//! produces a serializable [`PerformanceReport`].
//!
//! # Modules
//!
//! - [`init`]: subscriber setup
//! - [`file_writer`]: rotating file writer usable as a `MakeWriter`
//! - [`performance`]: timing aggregation, thresholds and observers

pub mod file_writer;
mod init;
pub mod performance;

pub use file_writer::RotatingFileWriter;
pub use init::init_tracing;
pub use performance::{
    Measurement, MetricKind, ObserverId, PerformanceMonitor, PerformanceReport,
    PerformanceThresholds, TimingStats,
};
