use crate::stats::latency::{LatencySummary, LatencyWindow};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Counters {
    input_lines: AtomicU64,
    reader_drops: AtomicU64,
    batches_created: AtomicU64,
    batched_lines: AtomicU64,
    batch_drops: AtomicU64,
    batch_drop_lines: AtomicU64,
    batches_delivered: AtomicU64,
    delivered_lines: AtomicU64,
    lost_batches: AtomicU64,
    lost_lines: AtomicU64,
    delivery_attempts: AtomicU64,
    delivery_failures: AtomicU64,
    latency_dropped: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

/// Process-wide statistics.
///
/// Counters are cumulative and never reset. Stages never see this type
/// directly: each gets a narrow handle ([`ReaderStats`], [`BatcherStats`],
/// [`OutletStats`]) exposing only the increments it performs.
#[derive(Debug, Clone)]
pub struct ProgramStats {
    counters: Arc<Counters>,
    latency: Arc<Mutex<LatencyWindow>>,
    started: Instant,
}

impl Default for ProgramStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramStats {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            latency: Arc::new(Mutex::new(LatencyWindow::default())),
            started: Instant::now(),
        }
    }

    pub fn reader(&self) -> ReaderStats {
        ReaderStats {
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn batcher(&self) -> BatcherStats {
        BatcherStats {
            counters: Arc::clone(&self.counters),
        }
    }

    /// Handle for an outlet. Latency observations go through `observations`,
    /// whose receiving end belongs to the stats emitter.
    pub fn outlet(&self, observations: mpsc::Sender<Duration>) -> OutletStats {
        OutletStats {
            counters: Arc::clone(&self.counters),
            observations,
        }
    }

    /// Fold one latency observation into the current interval.
    pub(crate) fn record_latency(&self, latency: Duration) {
        self.latency_window().record(latency);
    }

    /// Summary of the current interval, then start a fresh one.
    pub(crate) fn take_latency(&self) -> Option<LatencySummary> {
        self.latency_window().take()
    }

    fn latency_window(&self) -> MutexGuard<'_, LatencyWindow> {
        // The window holds plain numbers; a panic mid-update cannot leave it unusable.
        self.latency.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Point-in-time copy of every counter plus the open latency interval.
    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &self.counters;
        let reader_drops = load(&c.reader_drops);
        let batch_drop_lines = load(&c.batch_drop_lines);
        let lost_lines = load(&c.lost_lines);

        StatsSnapshot {
            uptime_seconds: self.started.elapsed().as_secs(),
            input_lines: load(&c.input_lines),
            reader_drops,
            batches_created: load(&c.batches_created),
            batched_lines: load(&c.batched_lines),
            batch_drops: load(&c.batch_drops),
            batch_drop_lines,
            batches_delivered: load(&c.batches_delivered),
            delivered_lines: load(&c.delivered_lines),
            lost_batches: load(&c.lost_batches),
            lost_lines,
            delivery_attempts: load(&c.delivery_attempts),
            delivery_failures: load(&c.delivery_failures),
            latency_dropped: load(&c.latency_dropped),
            drops: reader_drops + batch_drop_lines,
            lost: lost_lines,
            latency: self.latency_window().summary(),
        }
    }
}

/// Reader capability: counts lines read and lines dropped at the front channel.
#[derive(Debug, Clone)]
pub struct ReaderStats {
    counters: Arc<Counters>,
}

impl ReaderStats {
    pub fn line_read(&self) {
        bump(&self.counters.input_lines, 1);
    }

    pub fn line_dropped(&self) {
        bump(&self.counters.reader_drops, 1);
    }
}

/// Batcher capability: counts batches created and batches dropped at the back channel.
#[derive(Debug, Clone)]
pub struct BatcherStats {
    counters: Arc<Counters>,
}

impl BatcherStats {
    pub fn batch_created(&self, lines: usize) {
        bump(&self.counters.batches_created, 1);
        bump(&self.counters.batched_lines, lines as u64);
    }

    pub fn batch_dropped(&self, lines: usize) {
        bump(&self.counters.batch_drops, 1);
        bump(&self.counters.batch_drop_lines, lines as u64);
    }
}

/// Outlet capability: delivery attempts, outcomes and latency.
#[derive(Debug, Clone)]
pub struct OutletStats {
    counters: Arc<Counters>,
    observations: mpsc::Sender<Duration>,
}

impl OutletStats {
    pub fn attempt(&self) {
        bump(&self.counters.delivery_attempts, 1);
    }

    pub fn attempt_failed(&self) {
        bump(&self.counters.delivery_failures, 1);
    }

    pub fn delivered(&self, lines: usize, latency: Duration) {
        bump(&self.counters.batches_delivered, 1);
        bump(&self.counters.delivered_lines, lines as u64);

        // Never wait on the stats pipeline from the delivery path.
        if self.observations.try_send(latency).is_err() {
            bump(&self.counters.latency_dropped, 1);
        }
    }

    pub fn lost(&self, lines: usize) {
        bump(&self.counters.lost_batches, 1);
        bump(&self.counters.lost_lines, lines as u64);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: u64,
    pub input_lines: u64,
    pub reader_drops: u64,
    pub batches_created: u64,
    pub batched_lines: u64,
    pub batch_drops: u64,
    pub batch_drop_lines: u64,
    pub batches_delivered: u64,
    pub delivered_lines: u64,
    pub lost_batches: u64,
    pub lost_lines: u64,
    pub delivery_attempts: u64,
    pub delivery_failures: u64,
    pub latency_dropped: u64,
    /// Lines discarded before reaching an outlet.
    pub drops: u64,
    /// Lines discarded after exhausting delivery retries.
    pub lost: u64,
    pub latency: Option<LatencySummary>,
}

impl StatsSnapshot {
    /// Named counter values, in a stable order.
    pub fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("uptime_seconds", self.uptime_seconds),
            ("input_lines", self.input_lines),
            ("reader_drops", self.reader_drops),
            ("batches_created", self.batches_created),
            ("batched_lines", self.batched_lines),
            ("batch_drops", self.batch_drops),
            ("batch_drop_lines", self.batch_drop_lines),
            ("batches_delivered", self.batches_delivered),
            ("delivered_lines", self.delivered_lines),
            ("lost_batches", self.lost_batches),
            ("lost_lines", self.lost_lines),
            ("delivery_attempts", self.delivery_attempts),
            ("delivery_failures", self.delivery_failures),
            ("latency_dropped", self.latency_dropped),
            ("drops", self.drops),
            ("lost", self.lost),
        ]
    }

    /// One `log_shuttle.<name> <value>` line per counter.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.counters() {
            out.push_str(&format!("log_shuttle.{} {}\n", name, value));
        }
        if let Some(latency) = &self.latency {
            for (name, value) in latency.fields() {
                out.push_str(&format!("log_shuttle.delivery_latency.{} {:.3}\n", name, value));
            }
        }
        out
    }
}
