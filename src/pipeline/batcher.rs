use crate::pipeline::backpressure::{offer, Admission};
use crate::pipeline::batch::{Batch, BatchBuilder, CloseReason};
use crate::pipeline::channel::{Sender, SharedReceiver};
use crate::pipeline::pool::WorkerPool;
use crate::source::reader::LogLine;
use crate::stats::BatcherStats;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Batching thresholds shared by every batcher in a pool.
#[derive(Debug, Clone, Copy)]
pub struct BatcherSettings {
    pub batch_size: usize,
    /// Idle deadline, measured from a batch's first line.
    pub wait: Duration,
    /// Bounded wait before dropping a batch at the back channel.
    pub patience: Duration,
}

/// Spawn `count` batchers sharing `inbox` and `outbox`.
pub fn start_batchers(
    count: usize,
    settings: BatcherSettings,
    inbox: SharedReceiver<LogLine>,
    outbox: Sender<Batch>,
    stats: BatcherStats,
) -> WorkerPool {
    WorkerPool::spawn("batcher", count, |id| {
        run_batcher(id, settings, inbox.clone(), outbox.clone(), stats.clone())
    })
}

/// Run one batcher until the front channel is closed and drained.
///
/// Lines accumulate into a private batch that is published when it holds
/// `batch_size` lines or when `wait` has passed since its first line. The
/// partial batch is flushed before returning.
pub async fn run_batcher(
    id: usize,
    settings: BatcherSettings,
    inbox: SharedReceiver<LogLine>,
    outbox: Sender<Batch>,
    stats: BatcherStats,
) {
    let mut builder = BatchBuilder::new(id, settings.batch_size);
    // Armed only while the batch holds at least one line.
    let mut deadline: Option<Instant> = None;

    debug!(batcher = id, "Batcher started");

    loop {
        tokio::select! {
            line = inbox.recv() => {
                match line {
                    Some(line) => {
                        if let Some(batch) = builder.push(line) {
                            deadline = None;
                            publish(batch, &outbox, &stats, settings.patience).await;
                        } else if builder.len() == 1 {
                            // A wait beyond the clock's range means no idle deadline.
                            deadline = Instant::now().checked_add(settings.wait);
                        }
                    }
                    None => break,
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Some(batch) = builder.close(CloseReason::Idle) {
                    publish(batch, &outbox, &stats, settings.patience).await;
                }
            }
        }
    }

    if let Some(batch) = builder.close(CloseReason::Drain) {
        info!(batcher = id, lines = batch.len(), "Flushing partial batch");
        publish(batch, &outbox, &stats, settings.patience).await;
    }

    debug!(batcher = id, "Batcher shutdown complete");
}

async fn publish(batch: Batch, outbox: &Sender<Batch>, stats: &BatcherStats, patience: Duration) {
    let lines = batch.len();
    stats.batch_created(lines);

    debug!(
        batch_id = %batch.batch_id,
        batcher = batch.batcher_id,
        lines,
        reason = ?batch.close_reason,
        "Publishing batch"
    );

    match offer(outbox, batch, patience).await {
        Admission::Accepted => {}
        Admission::Full(batch) => {
            warn!(batch_id = %batch.batch_id, lines, "Back channel full, dropping batch");
            stats.batch_dropped(lines);
        }
        Admission::Closed(batch) => {
            warn!(batch_id = %batch.batch_id, lines, "Back channel closed, dropping batch");
            stats.batch_dropped(lines);
        }
    }
}
