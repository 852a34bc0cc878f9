//! Core types for the drowsewatch engine
//!
//! This module defines the data that flows through the engine: heart-rate
//! samples, the activity state that gates alerting, the events the engine
//! emits, and the driving-time report produced when a session ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// A single heart-rate reading delivered by the sensor source.
///
/// Immutable once created. Zero readings are sensor noise and are filtered
/// before a sample is ever constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Heart rate (bpm)
    pub bpm: u32,
    /// Wall-clock time the reading was taken (UTC)
    pub taken_at: DateTime<Utc>,
}

impl HeartRateSample {
    pub fn new(bpm: u32, taken_at: DateTime<Utc>) -> Self {
        Self { bpm, taken_at }
    }
}

/// Whether the subject is currently driving or paused for a rest.
///
/// Alerting is live only while `Active`; heart rate legitimately drops during
/// rest, so the detector suppresses events while `Resting`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Active,
    #[default]
    Resting,
}

impl ActivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Active => "active",
            ActivityState::Resting => "resting",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ActivityState::Active)
    }
}

/// Which detection rule produced a drowsiness event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTrigger {
    /// Live rate dropped below the rolling baseline by more than the drop ratio
    BaselineDrop,
    /// Live rate dropped below the configured absolute floor
    AbsoluteFloor,
}

impl AlertTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTrigger::BaselineDrop => "baseline_drop",
            AlertTrigger::AbsoluteFloor => "absolute_floor",
        }
    }
}

/// A detected drowsiness threshold crossing.
///
/// Emitted, never stored; downstream consumers decide persistence and
/// presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrowsinessEvent {
    /// When the crossing was detected (UTC)
    pub triggered_at: DateTime<Utc>,
    /// The reading that crossed the threshold (bpm)
    pub heart_rate: u32,
    /// Rolling baseline at evaluation time (bpm)
    pub baseline: f64,
    /// Threshold the reading was compared against (bpm)
    pub threshold: f64,
    /// Which rule fired
    pub trigger: AlertTrigger,
}

/// Session transition kinds, named as the telemetry collector expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    #[serde(rename = "start")]
    SessionStarted,
    #[serde(rename = "end")]
    SessionEnded,
    #[serde(rename = "restBegin")]
    RestBegan,
    #[serde(rename = "restEnd")]
    RestEnded,
    #[serde(rename = "emergency")]
    Emergency,
}

impl SessionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventKind::SessionStarted => "start",
            SessionEventKind::SessionEnded => "end",
            SessionEventKind::RestBegan => "restBegin",
            SessionEventKind::RestEnded => "restEnd",
            SessionEventKind::Emergency => "emergency",
        }
    }
}

/// An observed session transition edge.
///
/// Transitions that merely re-affirm the current state produce no event;
/// collaborators receive one notification per actual edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    /// When the transition happened (UTC)
    pub at: DateTime<Utc>,
    /// Identity of the session this edge belongs to
    pub session_id: Uuid,
}

/// Elapsed driving time for one session, split for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingTime {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DrivingTime {
    /// Split a total elapsed duration into hours/minutes/seconds.
    /// Sub-second remainders are truncated.
    pub fn from_duration(total: Duration) -> Self {
        let secs = total.as_secs();
        Self {
            hours: secs / 3600,
            minutes: (secs % 3600) / 60,
            seconds: secs % 60,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for DrivingTime {
    /// Formats as zero-padded `HH:MM:SS`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driving_time_split() {
        let dt = DrivingTime::from_duration(Duration::from_secs(3661));
        assert_eq!(dt.hours, 1);
        assert_eq!(dt.minutes, 1);
        assert_eq!(dt.seconds, 1);
        assert_eq!(dt.total_seconds(), 3661);
    }

    #[test]
    fn test_driving_time_format() {
        assert_eq!(
            DrivingTime::from_duration(Duration::from_secs(3661)).to_string(),
            "01:01:01"
        );
        assert_eq!(
            DrivingTime::from_duration(Duration::from_secs(0)).to_string(),
            "00:00:00"
        );
        assert_eq!(
            DrivingTime::from_duration(Duration::from_secs(7325)).to_string(),
            "02:02:05"
        );
    }

    #[test]
    fn test_session_event_kind_wire_names() {
        let kinds = [
            (SessionEventKind::SessionStarted, "start"),
            (SessionEventKind::SessionEnded, "end"),
            (SessionEventKind::RestBegan, "restBegin"),
            (SessionEventKind::RestEnded, "restEnd"),
            (SessionEventKind::Emergency, "emergency"),
        ];
        for (kind, wire) in kinds {
            assert_eq!(kind.as_str(), wire);
            assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{wire}\""));
        }
    }

    #[test]
    fn test_activity_state_default_is_resting() {
        assert_eq!(ActivityState::default(), ActivityState::Resting);
        assert!(!ActivityState::default().is_active());
    }
}
