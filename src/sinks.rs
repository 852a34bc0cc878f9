//! Presentation seam
//!
//! The engine does not render anything itself. Alerts and elapsed-time ticks
//! are handed to an [`AlertSink`], and the embedding shell decides what a
//! vibration, notification, or clock display looks like.

use std::time::Duration;

use log::{info, warn};

use crate::types::DrowsinessEvent;

/// Consumer of alerts and elapsed-time ticks.
///
/// Implementations must be cheap and non-blocking; they are invoked from the
/// session runtime's hot path.
pub trait AlertSink: Send + Sync {
    /// A drowsiness threshold crossing was detected.
    fn on_drowsiness(&self, event: &DrowsinessEvent);

    /// Periodic elapsed-driving-time refresh while the timer runs.
    fn on_elapsed_tick(&self, elapsed: Duration);
}

/// Default sink that writes alerts and ticks to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn on_drowsiness(&self, event: &DrowsinessEvent) {
        warn!(
            "drowsiness detected: {} bpm (baseline {:.1}, threshold {:.1}, rule {})",
            event.heart_rate,
            event.baseline,
            event.threshold,
            event.trigger.as_str()
        );
    }

    fn on_elapsed_tick(&self, elapsed: Duration) {
        info!("driving time: {}s", elapsed.as_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::types::AlertTrigger;

    #[derive(Debug, Default)]
    struct CountingSink {
        alerts: AtomicUsize,
        ticks: AtomicUsize,
    }

    impl AlertSink for CountingSink {
        fn on_drowsiness(&self, _event: &DrowsinessEvent) {
            self.alerts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_elapsed_tick(&self, _elapsed: Duration) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_sink_is_object_safe() {
        let counting = Arc::new(CountingSink::default());
        let sink: Arc<dyn AlertSink> = counting.clone();
        let event = DrowsinessEvent {
            triggered_at: Utc::now(),
            heart_rate: 58,
            baseline: 80.0,
            threshold: 74.4,
            trigger: AlertTrigger::BaselineDrop,
        };

        sink.on_drowsiness(&event);
        sink.on_elapsed_tick(Duration::from_secs(3));

        assert_eq!(counting.alerts.load(Ordering::SeqCst), 1);
        assert_eq!(counting.ticks.load(Ordering::SeqCst), 1);
    }
}
