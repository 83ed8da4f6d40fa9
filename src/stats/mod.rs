pub mod counters;
pub mod emitter;
pub mod latency;
pub mod server;

use std::net::SocketAddr;
use thiserror::Error;

pub use counters::{BatcherStats, OutletStats, ProgramStats, ReaderStats, StatsSnapshot};
pub use emitter::{run_emitter, HttpStatsSink, LogStatsSink, StatsReport, StatsSink};
pub use latency::LatencySummary;
pub use server::{bind_stats_listener, serve_stats, stats_router};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to bind stats listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("stats server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stats push failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stats sink returned status {status}: {message}")]
    SinkStatus { status: u16, message: String },
}
