//! Drive monitor facade
//!
//! `DriveMonitor` owns every piece of session state behind a single mutex:
//! the sample buffer, the activity tracker, and the driving-time stopwatch.
//! Accepting a reading and evaluating it against the threshold happen inside
//! one critical section, so a control transition issued from the UI context
//! can never interleave between the baseline update and the decision for the
//! same sample.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityTracker;
use crate::baseline::SampleBuffer;
use crate::config::MonitorConfig;
use crate::detector::DrowsinessDetector;
use crate::error::MonitorError;
use crate::stopwatch::DriveTimer;
use crate::types::{
    ActivityState, DrivingTime, DrowsinessEvent, HeartRateSample, SessionEvent,
};

/// What happened when a reading was fed to the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingOutcome {
    /// Whether the reading entered the sample buffer (zero readings do not)
    pub accepted: bool,
    /// Baseline after the buffer update, if any samples were ever retained
    pub baseline: Option<f64>,
    /// Drowsiness event, when the reading crossed the threshold while active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<DrowsinessEvent>,
    /// Emergency session event accompanying the alert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency: Option<SessionEvent>,
}

/// Result of ending a session: the closing event plus the driving time to
/// report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub event: SessionEvent,
    pub driving_time: DrivingTime,
}

#[derive(Debug)]
struct MonitorState {
    buffer: SampleBuffer,
    tracker: ActivityTracker,
    timer: DriveTimer,
}

/// Stateful monitoring engine for one wearer.
///
/// All methods take `&self`; internal state lives behind one mutex. The
/// sensor-callback context calls `record_reading` while the controller
/// context drives the session transitions, and both contend on the same
/// guard.
#[derive(Debug)]
pub struct DriveMonitor {
    detector: DrowsinessDetector,
    state: Mutex<MonitorState>,
}

impl Default for DriveMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl DriveMonitor {
    /// Create a monitor from a config. The config is assumed validated;
    /// use [`DriveMonitor::try_new`] for untrusted input.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            detector: DrowsinessDetector::new(config.detector),
            state: Mutex::new(MonitorState {
                buffer: SampleBuffer::new(config.buffer_capacity, config.eviction),
                tracker: ActivityTracker::new(),
                timer: DriveTimer::new(),
            }),
        }
    }

    /// Validate the config, then create a monitor from it.
    pub fn try_new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Feed one sensor reading through the accept + evaluate critical
    /// section.
    ///
    /// Zero readings are sensor noise: they are not buffered and never
    /// alert, but the current baseline is still reported. An alert while a
    /// session is open also carries the matching emergency session event for
    /// the telemetry forwarder.
    pub fn record_reading(
        &self,
        bpm: u32,
        taken_at: DateTime<Utc>,
    ) -> Result<ReadingOutcome, MonitorError> {
        let mut state = self.lock()?;

        if bpm == 0 {
            return Ok(ReadingOutcome {
                accepted: false,
                baseline: state.buffer.baseline(),
                alert: None,
                emergency: None,
            });
        }

        let sample = HeartRateSample::new(bpm, taken_at);
        let baseline = state.buffer.accept(&sample);
        let alert = self
            .detector
            .evaluate(&sample, baseline, state.tracker.state());

        let emergency = match &alert {
            Some(event) => {
                debug!(
                    "drowsiness alert: {} bpm under threshold {:.2}",
                    event.heart_rate, event.threshold
                );
                state.tracker.emergency(taken_at)
            }
            None => None,
        };

        Ok(ReadingOutcome {
            accepted: true,
            baseline,
            alert,
            emergency,
        })
    }

    /// Open a session: activity goes active and the stopwatch starts.
    /// Returns the session-started event, or `None` while already open.
    pub fn start_session(&self) -> Result<Option<SessionEvent>, MonitorError> {
        let mut state = self.lock()?;
        let event = state.tracker.start(Utc::now());
        if event.is_some() {
            state.timer.start(Instant::now());
        }
        Ok(event)
    }

    /// Begin a rest: alerting is suppressed and the stopwatch pauses.
    pub fn pause_session(&self) -> Result<Option<SessionEvent>, MonitorError> {
        let mut state = self.lock()?;
        let event = state.tracker.pause(Utc::now());
        if event.is_some() {
            state.timer.pause(Instant::now());
        }
        Ok(event)
    }

    /// End a rest: alerting resumes and the stopwatch continues.
    pub fn resume_session(&self) -> Result<Option<SessionEvent>, MonitorError> {
        let mut state = self.lock()?;
        let event = state.tracker.resume(Utc::now());
        if event.is_some() {
            state.timer.resume(Instant::now());
        }
        Ok(event)
    }

    /// Close the session and report its driving time.
    ///
    /// The sample buffer deliberately survives: the baseline keeps its
    /// history across sessions within one process. Only the stopwatch
    /// accumulators reset.
    pub fn end_session(&self) -> Result<Option<SessionSummary>, MonitorError> {
        let mut state = self.lock()?;
        let event = match state.tracker.stop(Utc::now()) {
            Some(event) => event,
            None => return Ok(None),
        };
        let total = state.timer.stop(Instant::now());
        Ok(Some(SessionSummary {
            event,
            driving_time: DrivingTime::from_duration(total),
        }))
    }

    pub fn activity_state(&self) -> Result<ActivityState, MonitorError> {
        Ok(self.lock()?.tracker.state())
    }

    pub fn is_in_session(&self) -> Result<bool, MonitorError> {
        Ok(self.lock()?.tracker.is_in_session())
    }

    /// Current rolling baseline, `None` until a sample has been retained
    pub fn baseline(&self) -> Result<Option<f64>, MonitorError> {
        Ok(self.lock()?.buffer.baseline())
    }

    /// Number of readings currently retained in the buffer
    pub fn buffer_len(&self) -> Result<usize, MonitorError> {
        Ok(self.lock()?.buffer.len())
    }

    /// Elapsed driving time in the current session, for the display tick
    pub fn elapsed(&self) -> Result<Duration, MonitorError> {
        Ok(self.lock()?.timer.elapsed(Instant::now()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MonitorState>, MonitorError> {
        self.state
            .lock()
            .map_err(|e| MonitorError::Poisoned(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::types::SessionEventKind;

    fn monitor() -> DriveMonitor {
        DriveMonitor::default()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_reading_updates_baseline() {
        let monitor = monitor();

        monitor.record_reading(80, now()).unwrap();
        monitor.record_reading(82, now()).unwrap();
        let outcome = monitor.record_reading(81, now()).unwrap();

        assert!(outcome.accepted);
        assert!((outcome.baseline.unwrap() - 81.0).abs() < 1e-9);
        assert_eq!(monitor.buffer_len().unwrap(), 3);
    }

    #[test]
    fn test_drop_fires_alert_only_while_active() {
        let monitor = monitor();
        for bpm in [80, 82, 81] {
            monitor.record_reading(bpm, now()).unwrap();
        }

        // Resting: 60 is far below threshold but nothing fires
        let outcome = monitor.record_reading(60, now()).unwrap();
        assert!(outcome.alert.is_none());

        monitor.start_session().unwrap();

        // Buffer now holds [80, 82, 81, 60] -> baseline 75.75, threshold
        // ~70.45; 60 crosses it
        let outcome = monitor.record_reading(60, now()).unwrap();
        let alert = outcome.alert.expect("alert should fire while active");
        assert_eq!(alert.heart_rate, 60);
        // Single critical section: the alert saw exactly the baseline the
        // buffer reported for this sample
        assert_eq!(Some(alert.baseline), outcome.baseline);
        assert_eq!(
            outcome.emergency.unwrap().kind,
            SessionEventKind::Emergency
        );
    }

    #[test]
    fn test_zero_reading_is_filtered() {
        let monitor = monitor();
        monitor.record_reading(75, now()).unwrap();
        monitor.start_session().unwrap();

        let outcome = monitor.record_reading(0, now()).unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.alert.is_none());
        assert!((outcome.baseline.unwrap() - 75.0).abs() < 1e-9);
        assert_eq!(monitor.buffer_len().unwrap(), 1);
    }

    #[test]
    fn test_no_alert_before_any_baseline() {
        let monitor = DriveMonitor::new(MonitorConfig::default());
        monitor.start_session().unwrap();

        // First reading ever: baseline becomes the reading itself, which can
        // never sit below its own threshold
        let outcome = monitor.record_reading(30, now()).unwrap();
        assert!(outcome.alert.is_none());
    }

    #[test]
    fn test_session_lifecycle_events() {
        let monitor = monitor();

        let started = monitor.start_session().unwrap().unwrap();
        assert_eq!(started.kind, SessionEventKind::SessionStarted);
        assert!(monitor.start_session().unwrap().is_none());

        let paused = monitor.pause_session().unwrap().unwrap();
        assert_eq!(paused.kind, SessionEventKind::RestBegan);
        assert_eq!(
            monitor.activity_state().unwrap(),
            ActivityState::Resting
        );

        let resumed = monitor.resume_session().unwrap().unwrap();
        assert_eq!(resumed.kind, SessionEventKind::RestEnded);

        let summary = monitor.end_session().unwrap().unwrap();
        assert_eq!(summary.event.kind, SessionEventKind::SessionEnded);
        assert!(monitor.end_session().unwrap().is_none());
    }

    #[test]
    fn test_buffer_survives_session_end() {
        let monitor = monitor();
        monitor.start_session().unwrap();
        monitor.record_reading(72, now()).unwrap();
        monitor.end_session().unwrap();

        assert_eq!(monitor.buffer_len().unwrap(), 1);
        assert!(monitor.baseline().unwrap().is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MonitorConfig {
            detector: DetectorConfig {
                drop_ratio: 1.5,
                min_bpm_floor: None,
            },
            ..Default::default()
        };
        assert!(DriveMonitor::try_new(config).is_err());
    }

    #[test]
    fn test_scenario_from_observed_behavior() {
        // Baseline [80, 82, 81] = 81.0, threshold 75.33
        let monitor = monitor();
        for bpm in [80, 82, 81] {
            monitor.record_reading(bpm, now()).unwrap();
        }
        monitor.start_session().unwrap();

        // 76 stays above the threshold after joining the buffer
        // ([80,82,81,76] -> baseline 79.75, threshold ~74.17)
        let outcome = monitor.record_reading(76, now()).unwrap();
        assert!(outcome.alert.is_none());
    }
}
