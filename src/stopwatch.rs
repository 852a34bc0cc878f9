//! Driving-time stopwatch
//!
//! Tracks elapsed active time for one session with pause/resume. Every
//! operation takes an explicit `now` so tests can drive a synthetic clock;
//! the monitor supplies `Instant::now()`.

use std::time::{Duration, Instant};

/// Stopwatch with pause/resume and a reported-then-reset total.
///
/// `stop` reports the session total and immediately zeroes it, so a second
/// `stop` without an intervening `start` reports zero. Totals deliberately
/// do not persist across stop cycles.
#[derive(Debug, Clone, Default)]
pub struct DriveTimer {
    running: bool,
    started_at: Option<Instant>,
    accumulated: Duration,
    total: Duration,
}

impl DriveTimer {
    /// Initial state: stopped, nothing accumulated
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin timing. No effect while already running.
    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.started_at = Some(now);
        self.running = true;
    }

    /// Stop the clock and bank the elapsed segment. No effect while paused.
    pub fn pause(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += now.saturating_duration_since(started_at);
        }
        self.running = false;
    }

    /// Restart the clock after a pause. Same math as `start`.
    pub fn resume(&mut self, now: Instant) {
        self.start(now);
    }

    /// End the session and report its total elapsed time.
    ///
    /// The running segment (if any) and everything accumulated across pauses
    /// are summed into the total, which is returned and then reset to zero.
    pub fn stop(&mut self, now: Instant) -> Duration {
        if self.running {
            self.pause(now);
        }
        self.total += self.accumulated;
        self.accumulated = Duration::ZERO;

        let reported = self.total;
        self.total = Duration::ZERO;
        reported
    }

    /// Elapsed time so far in the current session, including the running
    /// segment. Read by the periodic display tick.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let live = match (self.running, self.started_at) {
            (true, Some(started_at)) => now.saturating_duration_since(started_at),
            _ => Duration::ZERO,
        };
        self.accumulated + live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_initial_state() {
        let timer = DriveTimer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_start_then_stop_reports_elapsed() {
        let t0 = Instant::now();
        let mut timer = DriveTimer::new();

        timer.start(t0);
        assert!(timer.is_running());
        assert_eq!(timer.elapsed(t0 + secs(5)), secs(5));

        assert_eq!(timer.stop(t0 + secs(10)), secs(10));
        assert!(!timer.is_running());
    }

    #[test]
    fn test_pause_banks_elapsed_segment() {
        let t0 = Instant::now();
        let mut timer = DriveTimer::new();

        timer.start(t0);
        timer.pause(t0 + secs(3));
        assert!(!timer.is_running());

        // Clock does not advance while paused
        assert_eq!(timer.elapsed(t0 + secs(30)), secs(3));

        timer.resume(t0 + secs(30));
        assert_eq!(timer.elapsed(t0 + secs(34)), secs(7));
    }

    #[test]
    fn test_stop_sums_segments_across_pauses() {
        let t0 = Instant::now();
        let mut timer = DriveTimer::new();

        timer.start(t0);
        timer.pause(t0 + secs(4));
        timer.resume(t0 + secs(10));
        timer.pause(t0 + secs(13));

        // 4s + 3s, nothing running at stop time
        assert_eq!(timer.stop(t0 + secs(60)), secs(7));
    }

    #[test]
    fn test_total_does_not_persist_across_stops() {
        let t0 = Instant::now();
        let mut timer = DriveTimer::new();

        timer.start(t0);
        assert_eq!(timer.stop(t0 + secs(8)), secs(8));

        // Second stop without a start reports zero
        assert_eq!(timer.stop(t0 + secs(20)), Duration::ZERO);

        // A fresh session counts only its own time
        timer.start(t0 + secs(100));
        assert_eq!(timer.stop(t0 + secs(105)), secs(5));
    }

    #[test]
    fn test_redundant_transitions_are_no_ops() {
        let t0 = Instant::now();
        let mut timer = DriveTimer::new();

        timer.start(t0);
        // Re-starting must not move the segment origin forward
        timer.start(t0 + secs(5));
        assert_eq!(timer.elapsed(t0 + secs(6)), secs(6));

        timer.pause(t0 + secs(6));
        timer.pause(t0 + secs(9));
        assert_eq!(timer.elapsed(t0 + secs(9)), secs(6));
    }
}
