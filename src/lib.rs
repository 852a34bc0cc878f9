//! Drowsewatch - On-device drowsiness-detection engine for heart-rate wearables
//!
//! The engine keeps a rolling baseline of recent heart-rate readings and
//! raises a drowsiness alert when the live rate drops abnormally far below
//! that baseline while the wearer is actively driving. A session stopwatch
//! tracks driving time, and best-effort telemetry forwards readings,
//! durations, and events to a remote collector.
//!
//! ## Modules
//!
//! - **Core engine**: sample buffer + baseline, activity state machine,
//!   drowsiness detector, driving-time stopwatch, all behind the
//!   [`DriveMonitor`] facade
//! - **Session runtime**: async wiring of the monitor to alert sinks and
//!   the telemetry forwarder

pub mod activity;
pub mod baseline;
pub mod config;
pub mod detector;
pub mod error;
pub mod monitor;
pub mod runtime;
pub mod schema;
pub mod sinks;
pub mod stopwatch;
pub mod telemetry;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{DetectorConfig, MonitorConfig, RuntimeConfig, TelemetryConfig};
pub use error::{MonitorError, TelemetryError};
pub use monitor::{DriveMonitor, ReadingOutcome, SessionSummary};
pub use runtime::SessionRuntime;
pub use sinks::{AlertSink, LogAlertSink};
pub use telemetry::{HttpCollector, LogCollector, TelemetryCollector, TelemetryRecord};
pub use types::{ActivityState, DrowsinessEvent, HeartRateSample, SessionEvent};

// Schema exports
pub use schema::{StreamRecord, STREAM_SCHEMA_VERSION};

/// Engine version reported over FFI and by the CLI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
