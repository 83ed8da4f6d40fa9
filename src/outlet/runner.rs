use crate::outlet::client::Deliver;
use crate::pipeline::batch::Batch;
use crate::pipeline::channel::SharedReceiver;
use crate::pipeline::pool::WorkerPool;
use crate::stats::OutletStats;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Retry schedule for a delivery.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: usize,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    /// Sleep after the given failed attempt (1-based): doubles each time, capped.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.backoff_initial
            .saturating_mul(1u32 << shift)
            .min(self.backoff_max)
    }
}

impl From<&crate::config::types::DeliveryConfig> for RetryPolicy {
    fn from(config: &crate::config::types::DeliveryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_initial: config.backoff_initial,
            backoff_max: config.backoff_max,
        }
    }
}

/// How a batch left the outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered { attempts: usize },
    Lost { attempts: usize },
}

/// Spawn `count` outlets sharing `inbox`.
pub fn start_outlets(
    count: usize,
    policy: RetryPolicy,
    inbox: SharedReceiver<Batch>,
    deliverer: Arc<dyn Deliver>,
    stats: OutletStats,
) -> WorkerPool {
    WorkerPool::spawn("outlet", count, |id| {
        run_outlet(
            id,
            policy,
            inbox.clone(),
            Arc::clone(&deliverer),
            stats.clone(),
        )
    })
}

/// Run one outlet until the back channel is closed and drained. An
/// in-flight delivery, retries included, always completes before the check.
pub async fn run_outlet(
    id: usize,
    policy: RetryPolicy,
    inbox: SharedReceiver<Batch>,
    deliverer: Arc<dyn Deliver>,
    stats: OutletStats,
) {
    debug!(outlet = id, "Outlet started");

    while let Some(batch) = inbox.recv().await {
        deliver_with_retry(&batch, deliverer.as_ref(), &policy, &stats).await;
    }

    debug!(outlet = id, "Outlet shutdown complete");
}

/// Deliver a batch, retrying failures with backoff. A batch that exhausts
/// its retries is counted as lost and discarded.
pub async fn deliver_with_retry(
    batch: &Batch,
    deliverer: &dyn Deliver,
    policy: &RetryPolicy,
    stats: &OutletStats,
) -> Outcome {
    let mut attempts = 0;

    loop {
        attempts += 1;
        stats.attempt();
        let started = Instant::now();

        match deliverer.deliver(batch).await {
            Ok(()) => {
                let latency = started.elapsed();
                stats.delivered(batch.len(), latency);
                debug!(
                    batch_id = %batch.batch_id,
                    lines = batch.len(),
                    attempts,
                    latency_ms = latency.as_millis() as u64,
                    "Delivered batch"
                );
                return Outcome::Delivered { attempts };
            }
            Err(e) => {
                stats.attempt_failed();

                if attempts > policy.max_retries {
                    warn!(
                        batch_id = %batch.batch_id,
                        lines = batch.len(),
                        attempts,
                        error = %e,
                        "Max retries exceeded, batch lost"
                    );
                    stats.lost(batch.len());
                    return Outcome::Lost { attempts };
                }

                let backoff = policy.backoff(attempts);
                debug!(
                    batch_id = %batch.batch_id,
                    attempt = attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Delivery failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
