//! Drowsiness detection rule
//!
//! A pure decision function over three inputs: the incoming sample, the
//! current baseline, and the activity state. Alerting is suppressed while
//! resting, where a dropping heart rate is expected rather than a warning
//! sign. Emitting the returned event to presentation and telemetry is the
//! caller's responsibility.

use crate::config::DetectorConfig;
use crate::types::{ActivityState, AlertTrigger, DrowsinessEvent, HeartRateSample};

/// Default multiplier applied to the baseline (alert on a >7% drop)
pub const DEFAULT_DROP_RATIO: f64 = 0.93;

/// Threshold-crossing detector
#[derive(Debug, Clone, Default)]
pub struct DrowsinessDetector {
    config: DetectorConfig,
}

impl DrowsinessDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Decide whether the sample constitutes a drowsiness event.
    ///
    /// Fires iff the state is `Active` and the reading is strictly below
    /// `baseline * drop_ratio`. A reading exactly at the threshold does not
    /// fire. With no baseline (buffer never filled), no decision is possible
    /// and nothing fires, including the absolute-floor rule.
    pub fn evaluate(
        &self,
        sample: &HeartRateSample,
        baseline: Option<f64>,
        state: ActivityState,
    ) -> Option<DrowsinessEvent> {
        let baseline = baseline?;

        if state != ActivityState::Active {
            return None;
        }

        let value = f64::from(sample.bpm);
        let threshold = baseline * self.config.drop_ratio;

        if value < threshold {
            return Some(DrowsinessEvent {
                triggered_at: sample.taken_at,
                heart_rate: sample.bpm,
                baseline,
                threshold,
                trigger: AlertTrigger::BaselineDrop,
            });
        }

        if let Some(floor) = self.config.min_bpm_floor {
            if sample.bpm < floor {
                return Some(DrowsinessEvent {
                    triggered_at: sample.taken_at,
                    heart_rate: sample.bpm,
                    baseline,
                    threshold: f64::from(floor),
                    trigger: AlertTrigger::AbsoluteFloor,
                });
            }
        }

        None
    }
}
