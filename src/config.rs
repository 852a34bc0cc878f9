//! Engine configuration
//!
//! All tunables live here so deployments can adjust detection sensitivity
//! and forwarding behavior without touching engine code. Every struct
//! deserializes from JSON with defaults for omitted fields.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::baseline::{EvictionPolicy, DEFAULT_BUFFER_CAPACITY};
use crate::detector::DEFAULT_DROP_RATIO;
use crate::error::MonitorError;

/// Detection rule tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Multiplier applied to the baseline to form the alert threshold.
    /// 0.93 means "alert on a drop of more than 7% below baseline".
    pub drop_ratio: f64,
    /// Optional absolute floor (bpm). Readings strictly below it raise an
    /// alert while active, independent of the baseline rule.
    pub min_bpm_floor: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            drop_ratio: DEFAULT_DROP_RATIO,
            min_bpm_floor: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if !self.drop_ratio.is_finite() || self.drop_ratio <= 0.0 || self.drop_ratio >= 1.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "drop_ratio must be within (0, 1), got {}",
                self.drop_ratio
            )));
        }
        if self.min_bpm_floor == Some(0) {
            return Err(MonitorError::InvalidConfig(
                "min_bpm_floor must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Monitor facade settings: buffer sizing plus the detection rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub buffer_capacity: usize,
    pub eviction: EvictionPolicy,
    pub detector: DetectorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            eviction: EvictionPolicy::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.buffer_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }
        self.detector.validate()
    }
}

/// Collector endpoint settings for the HTTP telemetry forwarder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Collector base URL, e.g. "https://collector.example.com"
    pub base_url: String,
    /// Subject identifier attached to every record
    pub user_id: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl TelemetryConfig {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_id: user_id.into(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Async session wiring knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interval between elapsed-time ticks while the timer runs
    pub tick_interval: Duration,
    /// Depth of the bounded telemetry queue
    pub queue_capacity: usize,
    /// Maximum concurrent outbound deliveries
    pub max_in_flight: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            queue_capacity: 64,
            max_in_flight: 4,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.tick_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "tick_interval must be non-zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(MonitorError::InvalidConfig(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
