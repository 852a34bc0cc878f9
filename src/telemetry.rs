//! Best-effort telemetry forwarding
//!
//! Heart-rate samples, driving-time reports, and session events are queued
//! onto a bounded channel and delivered by a pool of bounded concurrent
//! tasks. Delivery is fire-and-forget: a failed or dropped record is logged
//! and never retried, and the engine's correctness does not depend on it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::config::{RuntimeConfig, TelemetryConfig};
use crate::error::TelemetryError;
use crate::types::{DrivingTime, SessionEvent};

/// Wall-clock format the collector expects
const LOG_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// One outbound observability record.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    HeartRate { bpm: u32, taken_at: DateTime<Utc> },
    DrivingTime(DrivingTime),
    Session(SessionEvent),
}

/// Destination for telemetry records.
///
/// Implementations own transport detail (endpoints, payload shapes,
/// timeouts). The queue treats every record as independent and unordered.
#[async_trait]
pub trait TelemetryCollector: Send + Sync {
    async fn deliver(&self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeartRatePayload<'a> {
    user_id: &'a str,
    #[serde(rename = "heartrate")]
    heart_rate: u32,
    #[serde(rename = "heartratelogtime")]
    heart_rate_log_time: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DrivingTimePayload<'a> {
    user_id: &'a str,
    driving_time: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionEventPayload<'a> {
    user_id: &'a str,
    event: &'a str,
    session_id: String,
    event_time: String,
}

/// HTTP collector posting JSON records to the remote endpoint.
pub struct HttpCollector {
    config: TelemetryConfig,
    client: reqwest::Client,
}

impl HttpCollector {
    pub fn new(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/heartrate/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: Serialize>(&self, url: &str, payload: &T) -> Result<(), TelemetryError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryCollector for HttpCollector {
    async fn deliver(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let user_id = self.config.user_id.as_str();
        match record {
            TelemetryRecord::HeartRate { bpm, taken_at } => {
                let payload = HeartRatePayload {
                    user_id,
                    heart_rate: *bpm,
                    heart_rate_log_time: taken_at.format(LOG_TIME_FORMAT).to_string(),
                };
                self.post(&self.endpoint("heartrate"), &payload).await
            }
            TelemetryRecord::DrivingTime(driving_time) => {
                let payload = DrivingTimePayload {
                    user_id,
                    driving_time: driving_time.to_string(),
                };
                self.post(&self.endpoint("drivingtime"), &payload).await
            }
            TelemetryRecord::Session(event) => {
                let payload = SessionEventPayload {
                    user_id,
                    event: event.kind.as_str(),
                    session_id: event.session_id.to_string(),
                    event_time: event.at.format(LOG_TIME_FORMAT).to_string(),
                };
                self.post(&self.endpoint("event"), &payload).await
            }
        }
    }
}

/// Collector that only logs; used when no remote endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCollector;

#[async_trait]
impl TelemetryCollector for LogCollector {
    async fn deliver(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        match record {
            TelemetryRecord::HeartRate { bpm, taken_at } => {
                debug!("telemetry heart rate: {} bpm at {}", bpm, taken_at)
            }
            TelemetryRecord::DrivingTime(driving_time) => {
                debug!("telemetry driving time: {}", driving_time)
            }
            TelemetryRecord::Session(event) => {
                debug!("telemetry session event: {}", event.kind.as_str())
            }
        }
        Ok(())
    }
}

/// Bounded forwarding queue.
///
/// One dispatcher task drains the channel and spawns a delivery task per
/// record, gated by a semaphore so at most `max_in_flight` requests run at
/// once. A full queue drops the record with a warning instead of applying
/// backpressure to the sensor path.
pub struct TelemetryQueue {
    tx: mpsc::Sender<TelemetryRecord>,
    dispatcher: JoinHandle<()>,
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

impl TelemetryQueue {
    pub fn spawn(collector: Arc<dyn TelemetryCollector>, config: &RuntimeConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<TelemetryRecord>(config.queue_capacity);
        let max_in_flight = config.max_in_flight;
        let semaphore = Arc::new(Semaphore::new(max_in_flight));

        let pool = semaphore.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                // The semaphore is never closed, so acquisition cannot fail
                let Ok(permit) = pool.clone().acquire_owned().await else {
                    break;
                };
                let collector = collector.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = collector.deliver(&record).await {
                        warn!("telemetry delivery failed, record dropped: {}", e);
                    }
                });
            }
        });

        Self {
            tx,
            dispatcher,
            semaphore,
            max_in_flight,
        }
    }

    /// Enqueue a record without blocking. Drops and warns when the queue is
    /// full or already shut down.
    pub fn enqueue(&self, record: TelemetryRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("telemetry queue full, record dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("telemetry queue closed, record dropped");
            }
        }
    }

    /// Drain the queue and wait for every in-flight delivery to settle.
    pub async fn shutdown(self) {
        let Self {
            tx,
            dispatcher,
            semaphore,
            max_in_flight,
        } = self;

        // Closing the channel lets the dispatcher loop finish naturally
        drop(tx);
        if dispatcher.await.is_err() {
            warn!("telemetry dispatcher task panicked during shutdown");
        }
        // Delivery tasks each hold one permit; holding all of them means
        // every spawned delivery has finished
        if semaphore
            .acquire_many(max_in_flight as u32)
            .await
            .is_err()
        {
            warn!("telemetry semaphore closed during shutdown");
        }
    }
}
