use crate::stats::counters::{ProgramStats, StatsSnapshot};
use crate::stats::StatsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A snapshot as pushed to a metrics sink.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub source: String,
    pub measure_time: DateTime<Utc>,
    pub version: &'static str,
    #[serde(flatten)]
    pub snapshot: StatsSnapshot,
}

/// Destination of periodic stats pushes.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn push(&self, report: &StatsReport) -> Result<(), StatsError>;
}

/// POSTs each report as JSON.
#[derive(Debug)]
pub struct HttpStatsSink {
    url: String,
    client: reqwest::Client,
}

impl HttpStatsSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, StatsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl StatsSink for HttpStatsSink {
    async fn push(&self, report: &StatsReport) -> Result<(), StatsError> {
        let response = self.client.post(&self.url).json(report).send().await?;

        if !response.status().is_success() {
            return Err(StatsError::SinkStatus {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Writes each report to the process log.
#[derive(Debug, Default)]
pub struct LogStatsSink;

#[async_trait]
impl StatsSink for LogStatsSink {
    async fn push(&self, report: &StatsReport) -> Result<(), StatsError> {
        let s = &report.snapshot;
        info!(
            source = %report.source,
            input_lines = s.input_lines,
            drops = s.drops,
            lost = s.lost,
            batches_created = s.batches_created,
            batches_delivered = s.batches_delivered,
            delivery_failures = s.delivery_failures,
            latency_p50_ms = s.latency.as_ref().map(|l| l.p50_ms).unwrap_or_default(),
            "stats"
        );
        Ok(())
    }
}

/// Run the stats emitter.
///
/// Folds latency observations into `stats` as they arrive and pushes a report
/// to `sink` every `interval`, resetting the latency interval after each push.
/// Returns once every observation sender has been dropped, after a final push.
pub async fn run_emitter(
    stats: ProgramStats,
    mut observations: mpsc::Receiver<Duration>,
    sink: Arc<dyn StatsSink>,
    interval: Duration,
    source: String,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing to report yet.
    ticker.tick().await;

    info!(interval_ms = interval.as_millis() as u64, "Stats emitter started");

    loop {
        tokio::select! {
            observation = observations.recv() => {
                match observation {
                    Some(latency) => stats.record_latency(latency),
                    None => {
                        debug!("Stats channel closed");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                emit(&stats, sink.as_ref(), &source).await;
            }
        }
    }

    emit(&stats, sink.as_ref(), &source).await;
    info!("Stats emitter shutdown complete");
}

async fn emit(stats: &ProgramStats, sink: &dyn StatsSink, source: &str) {
    let mut snapshot = stats.snapshot();
    snapshot.latency = stats.take_latency();

    let report = StatsReport {
        source: source.to_string(),
        measure_time: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        snapshot,
    };

    // A failed push is not retried; the next interval carries fresh counters.
    if let Err(e) = sink.push(&report).await {
        warn!(error = %e, "Failed to push stats");
    }
}
