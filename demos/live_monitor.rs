//! demos/live_monitor.rs
//!
//! A simulated drive: start a session, stream heart-rate readings with a
//! drowsy dip, take a rest break, and stop. Alerts and ticks go to the log
//! sink; telemetry goes to the log collector.
//!
//! Run with: cargo run --example live_monitor --features cli

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use drowsewatch::config::RuntimeConfig;
use drowsewatch::monitor::DriveMonitor;
use drowsewatch::runtime::SessionRuntime;
use drowsewatch::sinks::LogAlertSink;
use drowsewatch::telemetry::LogCollector;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut session = SessionRuntime::new(
        DriveMonitor::default(),
        Arc::new(LogAlertSink),
        Arc::new(LogCollector),
        RuntimeConfig::default(),
    )
    .expect("default runtime config is valid");

    println!("[demo] starting drive");
    session.start_session().expect("session starts");

    // Settled cruising heart rate builds the baseline
    for bpm in [78, 80, 82, 81, 79, 80] {
        let outcome = session.record_reading(bpm, Utc::now()).expect("reading");
        println!(
            "[demo] {} bpm, baseline {:.1}",
            bpm,
            outcome.baseline.unwrap_or_default()
        );
        sleep(Duration::from_millis(400)).await;
    }

    // The drowsy dip: rate falls well below 93% of baseline
    for bpm in [72, 66, 60] {
        let outcome = session.record_reading(bpm, Utc::now()).expect("reading");
        match &outcome.alert {
            Some(alert) => println!(
                "[demo] {} bpm -> ALERT (threshold {:.1})",
                bpm, alert.threshold
            ),
            None => println!("[demo] {} bpm, no alert yet", bpm),
        }
        sleep(Duration::from_millis(400)).await;
    }

    // Driver pulls over for a rest; low readings no longer alert
    println!("[demo] rest break");
    session.pause_session().await.expect("pause");
    let outcome = session.record_reading(55, Utc::now()).expect("reading");
    assert!(outcome.alert.is_none());
    println!("[demo] 55 bpm while resting, correctly suppressed");
    sleep(Duration::from_secs(1)).await;

    println!("[demo] back on the road");
    session.resume_session().expect("resume");
    for bpm in [76, 79, 81] {
        session.record_reading(bpm, Utc::now()).expect("reading");
        sleep(Duration::from_millis(400)).await;
    }

    let summary = session
        .end_session()
        .await
        .expect("end")
        .expect("session was open");
    println!("[demo] drive over, driving time {}", summary.driving_time);

    session.shutdown().await;
}
