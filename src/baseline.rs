//! Rolling baseline over recent heart-rate samples
//!
//! The sample buffer retains the most recent readings (bounded) and derives
//! the baseline as their arithmetic mean. The baseline is the "normal"
//! reference point the detector compares live readings against.

use crate::types::HeartRateSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default sample buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 60;

/// What to do with a new sample once the buffer is full.
///
/// `Slide` keeps the baseline rolling with the wearer's current state.
/// `Freeze` pins the baseline to the first `capacity` readings of the
/// process; it reproduces historically observed behavior and is kept only
/// for comparison runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the oldest reading to make room (rolling window)
    #[default]
    Slide,
    /// Ignore new readings once full
    Freeze,
}

/// Capacity-bounded buffer of heart-rate readings with a mean baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBuffer {
    values: VecDeque<u32>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY, EvictionPolicy::default())
    }
}

impl SampleBuffer {
    /// Create a buffer with the given capacity and eviction policy
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    /// Accept a reading and return the updated baseline.
    ///
    /// Zero-valued readings never reach this point in normal operation (the
    /// intake filter discards them), but a zero here is still rejected rather
    /// than allowed to corrupt the baseline; the current baseline is returned
    /// unchanged. Returns `None` only while no sample was ever accepted.
    pub fn accept(&mut self, sample: &HeartRateSample) -> Option<f64> {
        if sample.bpm == 0 {
            return self.baseline();
        }

        if self.values.len() < self.capacity {
            self.values.push_back(sample.bpm);
        } else {
            match self.policy {
                EvictionPolicy::Slide => {
                    self.values.push_back(sample.bpm);
                    while self.values.len() > self.capacity {
                        self.values.pop_front();
                    }
                }
                EvictionPolicy::Freeze => {}
            }
        }

        self.baseline()
    }

    /// Current baseline: arithmetic mean of all retained readings.
    /// `None` while the buffer is empty, meaning no decision is possible.
    pub fn baseline(&self) -> Option<f64> {
        rolling_average(&self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Load a buffer snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the buffer snapshot to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Mean of the retained readings, `None` when empty
fn rolling_average(values: &VecDeque<u32>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|v| u64::from(*v)).sum();
    Some(sum as f64 / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(bpm: u32) -> HeartRateSample {
        HeartRateSample::new(bpm, Utc::now())
    }

    #[test]
    fn test_empty_buffer_has_no_baseline() {
        let buffer = SampleBuffer::default();
        assert!(buffer.baseline().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_baseline_is_mean_of_accepted_samples() {
        let mut buffer = SampleBuffer::default();

        buffer.accept(&sample(80));
        buffer.accept(&sample(82));
        let baseline = buffer.accept(&sample(81)).unwrap();

        assert!((baseline - 81.0).abs() < 1e-9);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_slide_keeps_most_recent_capacity_values() {
        let mut buffer = SampleBuffer::new(3, EvictionPolicy::Slide);

        // 60, 70, 80, 90, 100 with capacity 3 keeps 80, 90, 100
        for bpm in [60, 70, 80, 90, 100] {
            buffer.accept(&sample(bpm));
        }

        assert_eq!(buffer.len(), 3);
        assert!((buffer.baseline().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_freeze_pins_first_capacity_values() {
        let mut buffer = SampleBuffer::new(3, EvictionPolicy::Freeze);

        for bpm in [60, 70, 80, 90, 100] {
            buffer.accept(&sample(bpm));
        }

        // Only 60, 70, 80 were retained
        assert_eq!(buffer.len(), 3);
        assert!((buffer.baseline().unwrap() - 70.0).abs() < 1e-9);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_zero_reading_rejected() {
        let mut buffer = SampleBuffer::default();

        assert!(buffer.accept(&sample(0)).is_none());
        assert!(buffer.is_empty());

        buffer.accept(&sample(75));
        let baseline = buffer.accept(&sample(0)).unwrap();
        assert!((baseline - 75.0).abs() < 1e-9);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut buffer = SampleBuffer::new(5, EvictionPolicy::Slide);
        buffer.accept(&sample(72));
        buffer.accept(&sample(74));

        let json = buffer.to_json().unwrap();
        let loaded = SampleBuffer::from_json(&json).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.capacity(), 5);
        assert_eq!(loaded.baseline(), buffer.baseline());
    }
}
