//! Error types for drowsewatch

use thiserror::Error;

/// Errors surfaced by the monitor facade
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Monitor state lock poisoned: {0}")]
    Poisoned(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors that can occur while delivering telemetry.
///
/// Delivery is best-effort; these are logged at the dispatch boundary and
/// never surfaced to the engine.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collector rejected the record: HTTP {0}")]
    Status(u16),

    #[error("Telemetry queue is full, record dropped")]
    QueueFull,

    #[error("Telemetry queue is closed")]
    QueueClosed,
}
