use serde::Serialize;
use std::time::Duration;

/// Samples kept for percentile estimation within one interval; count, sum,
/// min and max cover every observation regardless.
const MAX_SAMPLES: usize = 4096;

/// Delivery latencies observed since the last push.
///
/// Percentile samples are every `stride`-th observation. When the buffer
/// fills, every other sample is discarded and the stride doubles, so the
/// kept samples stay evenly spread over the whole interval.
#[derive(Debug)]
pub struct LatencyWindow {
    count: u64,
    sum: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
    stride: u64,
    samples: Vec<Duration>,
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self {
            count: 0,
            sum: Duration::ZERO,
            min: None,
            max: None,
            stride: 1,
            samples: Vec::new(),
        }
    }
}

impl LatencyWindow {
    pub fn record(&mut self, latency: Duration) {
        let index = self.count;
        self.count += 1;
        self.sum += latency;
        self.min = Some(self.min.map_or(latency, |m| m.min(latency)));
        self.max = Some(self.max.map_or(latency, |m| m.max(latency)));

        if index % self.stride != 0 {
            return;
        }
        self.samples.push(latency);
        if self.samples.len() == MAX_SAMPLES {
            let mut position = 0;
            self.samples.retain(|_| {
                position += 1;
                position % 2 == 1
            });
            self.stride *= 2;
        }
    }

    pub fn summary(&self) -> Option<LatencySummary> {
        if self.count == 0 {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        Some(LatencySummary {
            count: self.count,
            sum_ms: millis(self.sum),
            mean_ms: millis(self.sum) / self.count as f64,
            min_ms: self.min.map(millis).unwrap_or_default(),
            max_ms: self.max.map(millis).unwrap_or_default(),
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
        })
    }

    /// Summarize and reset.
    pub fn take(&mut self) -> Option<LatencySummary> {
        let summary = self.summary();
        *self = Self::default();
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub sum_ms: f64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencySummary {
    pub fn fields(&self) -> [(&'static str, f64); 8] {
        [
            ("count", self.count as f64),
            ("sum_ms", self.sum_ms),
            ("mean_ms", self.mean_ms),
            ("min_ms", self.min_ms),
            ("max_ms", self.max_ms),
            ("p50_ms", self.p50_ms),
            ("p95_ms", self.p95_ms),
            ("p99_ms", self.p99_ms),
        ]
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

// Nearest-rank on an already sorted slice.
fn percentile(sorted: &[Duration], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    millis(sorted[idx])
}
