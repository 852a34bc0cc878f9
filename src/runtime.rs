//! Async session wiring
//!
//! `SessionRuntime` connects the monitor to its collaborators: alerts go to
//! the presentation sink, observability records go to the telemetry queue,
//! and a periodic tick reports the elapsed driving time while the timer
//! runs. The tick task is cancelled deterministically whenever the session
//! pauses or ends, so no recurring work outlives its owning state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RuntimeConfig;
use crate::error::MonitorError;
use crate::monitor::{DriveMonitor, ReadingOutcome, SessionSummary};
use crate::sinks::AlertSink;
use crate::telemetry::{TelemetryCollector, TelemetryQueue, TelemetryRecord};
use crate::types::SessionEvent;

struct Ticker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// One wearer's live monitoring session.
///
/// Control methods mirror the monitor's surface and add the collaborator
/// side effects: every session edge is forwarded to telemetry, every alert
/// reaches the sink, and the elapsed tick runs exactly while driving.
pub struct SessionRuntime {
    monitor: Arc<DriveMonitor>,
    sink: Arc<dyn AlertSink>,
    telemetry: TelemetryQueue,
    config: RuntimeConfig,
    ticker: Option<Ticker>,
}

impl SessionRuntime {
    pub fn new(
        monitor: DriveMonitor,
        sink: Arc<dyn AlertSink>,
        collector: Arc<dyn TelemetryCollector>,
        config: RuntimeConfig,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        let telemetry = TelemetryQueue::spawn(collector, &config);
        Ok(Self {
            monitor: Arc::new(monitor),
            sink,
            telemetry,
            config,
            ticker: None,
        })
    }

    pub fn monitor(&self) -> &DriveMonitor {
        &self.monitor
    }

    /// Feed one sensor reading. Zero readings are filtered here, before the
    /// core ever sees them, and produce no telemetry.
    pub fn record_reading(
        &self,
        bpm: u32,
        taken_at: DateTime<Utc>,
    ) -> Result<ReadingOutcome, MonitorError> {
        if bpm == 0 {
            debug!("zero heart-rate reading discarded as sensor noise");
            return self.monitor.record_reading(0, taken_at);
        }

        let outcome = self.monitor.record_reading(bpm, taken_at)?;

        self.telemetry
            .enqueue(TelemetryRecord::HeartRate { bpm, taken_at });

        if let Some(alert) = &outcome.alert {
            self.sink.on_drowsiness(alert);
        }
        if let Some(emergency) = &outcome.emergency {
            self.telemetry.enqueue(TelemetryRecord::Session(*emergency));
        }

        Ok(outcome)
    }

    /// Open the session, notify telemetry, and start the elapsed tick.
    pub fn start_session(&mut self) -> Result<Option<SessionEvent>, MonitorError> {
        let event = self.monitor.start_session()?;
        if let Some(event) = event {
            self.telemetry.enqueue(TelemetryRecord::Session(event));
            self.spawn_ticker();
        }
        Ok(event)
    }

    /// Begin a rest: the tick stops with the stopwatch.
    pub async fn pause_session(&mut self) -> Result<Option<SessionEvent>, MonitorError> {
        let event = self.monitor.pause_session()?;
        if let Some(event) = event {
            self.telemetry.enqueue(TelemetryRecord::Session(event));
            self.stop_ticker().await;
        }
        Ok(event)
    }

    /// End a rest: the tick resumes with the stopwatch.
    pub fn resume_session(&mut self) -> Result<Option<SessionEvent>, MonitorError> {
        let event = self.monitor.resume_session()?;
        if let Some(event) = event {
            self.telemetry.enqueue(TelemetryRecord::Session(event));
            self.spawn_ticker();
        }
        Ok(event)
    }

    /// Close the session, report the driving time to telemetry, and stop
    /// the tick.
    pub async fn end_session(&mut self) -> Result<Option<SessionSummary>, MonitorError> {
        self.stop_ticker().await;
        let summary = self.monitor.end_session()?;
        if let Some(summary) = &summary {
            self.telemetry
                .enqueue(TelemetryRecord::Session(summary.event));
            self.telemetry
                .enqueue(TelemetryRecord::DrivingTime(summary.driving_time));
        }
        Ok(summary)
    }

    /// Stop the tick and flush the telemetry queue. Call last.
    pub async fn shutdown(mut self) {
        self.stop_ticker().await;
        self.telemetry.shutdown().await;
    }

    fn spawn_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = self.monitor.clone();
        let sink = self.sink.clone();
        let period = self.config.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The immediate first tick would report zero; skip it
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match monitor.elapsed() {
                            Ok(elapsed) => sink.on_elapsed_tick(elapsed),
                            Err(e) => {
                                warn!("elapsed tick skipped: {}", e);
                            }
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        self.ticker = Some(Ticker { stop_tx, handle });
    }

    async fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.stop_tx.send(true);
            if ticker.handle.await.is_err() {
                warn!("elapsed tick task panicked");
            }
        }
    }
}

/// Elapsed durations reported by the tick, exposed for display formatting.
pub fn format_elapsed(elapsed: Duration) -> String {
    crate::types::DrivingTime::from_duration(elapsed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::error::TelemetryError;
    use crate::types::{DrowsinessEvent, SessionEventKind};

    #[derive(Default)]
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

    #[derive(Default)]
    struct CapturingCollector {
        records: Mutex<Vec<TelemetryRecord>>,
    }

    #[async_trait]
    impl TelemetryCollector for CapturingCollector {
        async fn deliver(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn runtime(
        sink: Arc<CountingSink>,
        collector: Arc<CapturingCollector>,
    ) -> SessionRuntime {
        SessionRuntime::new(
            DriveMonitor::default(),
            sink,
            collector,
            RuntimeConfig::default(),
        )
        .unwrap()
    }

    fn session_kinds(records: &[TelemetryRecord]) -> Vec<SessionEventKind> {
        records
            .iter()
            .filter_map(|r| match r {
                TelemetryRecord::Session(event) => Some(event.kind),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_session_edges_reach_telemetry() {
        let sink = Arc::new(CountingSink::default());
        let collector = Arc::new(CapturingCollector::default());
        let mut runtime = runtime(sink, collector.clone());

        runtime.start_session().unwrap();
        runtime.pause_session().await.unwrap();
        runtime.resume_session().unwrap();
        runtime.end_session().await.unwrap();
        runtime.shutdown().await;

        let records = collector.records.lock().unwrap();
        assert_eq!(
            session_kinds(&records),
            vec![
                SessionEventKind::SessionStarted,
                SessionEventKind::RestBegan,
                SessionEventKind::RestEnded,
                SessionEventKind::SessionEnded,
            ]
        );
        // Driving time is reported exactly once, at session end
        let driving_reports = records
            .iter()
            .filter(|r| matches!(r, TelemetryRecord::DrivingTime(_)))
            .count();
        assert_eq!(driving_reports, 1);
    }

    #[tokio::test]
    async fn test_alert_reaches_sink_and_telemetry() {
        let sink = Arc::new(CountingSink::default());
        let collector = Arc::new(CapturingCollector::default());
        let mut runtime = runtime(sink.clone(), collector.clone());

        for bpm in [80, 82, 81] {
            runtime.record_reading(bpm, Utc::now()).unwrap();
        }
        runtime.start_session().unwrap();
        runtime.record_reading(60, Utc::now()).unwrap();
        runtime.end_session().await.unwrap();
        runtime.shutdown().await;

        assert_eq!(sink.alerts.load(Ordering::SeqCst), 1);

        let records = collector.records.lock().unwrap();
        assert!(session_kinds(&records).contains(&SessionEventKind::Emergency));
        let heart_rates = records
            .iter()
            .filter(|r| matches!(r, TelemetryRecord::HeartRate { .. }))
            .count();
        assert_eq!(heart_rates, 4);
    }

    #[tokio::test]
    async fn test_zero_reading_produces_no_telemetry() {
        let sink = Arc::new(CountingSink::default());
        let collector = Arc::new(CapturingCollector::default());
        let mut runtime = runtime(sink, collector.clone());

        runtime.start_session().unwrap();
        let outcome = runtime.record_reading(0, Utc::now()).unwrap();
        assert!(!outcome.accepted);
        runtime.end_session().await.unwrap();
        runtime.shutdown().await;

        let records = collector.records.lock().unwrap();
        let heart_rates = records
            .iter()
            .filter(|r| matches!(r, TelemetryRecord::HeartRate { .. }))
            .count();
        assert_eq!(heart_rates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_runs_only_while_driving() {
        let sink = Arc::new(CountingSink::default());
        let collector = Arc::new(CapturingCollector::default());
        let config = RuntimeConfig {
            tick_interval: Duration::from_secs(1),
            ..Default::default()
        };
        let mut runtime = SessionRuntime::new(
            DriveMonitor::default(),
            sink.clone(),
            collector,
            config,
        )
        .unwrap();

        runtime.start_session().unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        runtime.pause_session().await.unwrap();

        let ticks_at_pause = sink.ticks.load(Ordering::SeqCst);
        assert!(ticks_at_pause >= 3);

        // Paused: the tick task is gone, not merely idle
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.ticks.load(Ordering::SeqCst), ticks_at_pause);

        runtime.resume_session().unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(sink.ticks.load(Ordering::SeqCst) > ticks_at_pause);

        runtime.end_session().await.unwrap();
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_redundant_controls_emit_nothing() {
        let sink = Arc::new(CountingSink::default());
        let collector = Arc::new(CapturingCollector::default());
        let mut runtime = runtime(sink, collector.clone());

        runtime.start_session().unwrap();
        assert!(runtime.start_session().unwrap().is_none());
        assert!(runtime.resume_session().unwrap().is_none());
        runtime.end_session().await.unwrap();
        assert!(runtime.end_session().await.unwrap().is_none());
        runtime.shutdown().await;

        let records = collector.records.lock().unwrap();
        assert_eq!(
            session_kinds(&records),
            vec![
                SessionEventKind::SessionStarted,
                SessionEventKind::SessionEnded,
            ]
        );
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(75)), "00:01:15");
    }
}
