use crate::config::types::ShuttleConfig;
use crate::config::validate_config;
use crate::outlet::client::Deliver;
use crate::outlet::runner::{start_outlets, RetryPolicy};
use crate::pipeline::batch::Batch;
use crate::pipeline::batcher::{start_batchers, BatcherSettings};
use crate::pipeline::channel::{create_shared_channel, Sender};
use crate::pipeline::pool::WorkerPool;
use crate::shuttle::state::ShutdownPhase;
use crate::shuttle::ShuttleError;
use crate::source::reader::{ReadSummary, Reader};
use crate::stats::{
    bind_stats_listener, run_emitter, serve_stats, ProgramStats, StatsError, StatsSink,
    StatsSnapshot,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A running pipeline: reader, batcher pool, outlet pool and stats tasks.
///
/// Every stage is spawned by [`Shuttle::start`]. Input is fed once through
/// [`Shuttle::read`]; [`Shuttle::shutdown`] then drains the stages in order.
pub struct Shuttle {
    phase: ShutdownPhase,
    stats: ProgramStats,
    reader: Option<Reader>,
    back_tx: Option<Sender<Batch>>,
    observations_tx: Option<mpsc::Sender<Duration>>,
    batchers: Option<WorkerPool>,
    outlets: Option<WorkerPool>,
    emitter: Option<JoinHandle<()>>,
    server: Option<JoinHandle<Result<(), StatsError>>>,
    server_shutdown: CancellationToken,
    stats_addr: Option<SocketAddr>,
}

impl Shuttle {
    /// Spawn every stage. Consumers start before producers, so nothing is
    /// ever offered to a channel nobody reads.
    ///
    /// Fails if the config is invalid or the stats listener cannot be bound.
    pub async fn start(
        config: &ShuttleConfig,
        deliverer: Arc<dyn Deliver>,
        sink: Arc<dyn StatsSink>,
    ) -> Result<Self, ShuttleError> {
        validate_config(config)?;

        let stats = ProgramStats::new();
        let server_shutdown = CancellationToken::new();

        let (server, stats_addr) = match config.stats.addr {
            Some(addr) => {
                let listener = bind_stats_listener(addr).await?;
                let local_addr = listener.local_addr().map_err(StatsError::Io)?;
                let handle = tokio::spawn(serve_stats(
                    listener,
                    stats.clone(),
                    server_shutdown.clone(),
                ));
                (Some(handle), Some(local_addr))
            }
            None => (None, None),
        };

        let (observations_tx, observations_rx) = mpsc::channel(config.stats.buffer);
        let emitter = tokio::spawn(run_emitter(
            stats.clone(),
            observations_rx,
            sink,
            config.stats.interval,
            config.stats.source.clone(),
        ));

        let (back_tx, back_rx) = create_shared_channel(config.back_buffer);
        let outlets = start_outlets(
            config.num_outlets,
            RetryPolicy::from(&config.delivery),
            back_rx,
            deliverer,
            stats.outlet(observations_tx.clone()),
        );

        let (front_tx, front_rx) = create_shared_channel(config.front_buffer);
        let batchers = start_batchers(
            config.num_batchers,
            BatcherSettings {
                batch_size: config.batch_size,
                wait: config.wait,
                patience: config.drop_patience,
            },
            front_rx,
            back_tx.clone(),
            stats.batcher(),
        );

        let reader = Reader::new(
            front_tx,
            stats.reader(),
            config.syslog.input_format,
            config.drop_patience,
        );

        info!(
            batchers = batchers.size(),
            outlets = outlets.size(),
            batch_size = config.batch_size,
            front_buffer = config.front_buffer,
            back_buffer = config.back_buffer,
            "Shuttle started"
        );

        Ok(Self {
            phase: ShutdownPhase::Running,
            stats,
            reader: Some(reader),
            back_tx: Some(back_tx),
            observations_tx: Some(observations_tx),
            batchers: Some(batchers),
            outlets: Some(outlets),
            emitter: Some(emitter),
            server,
            server_shutdown,
            stats_addr,
        })
    }

    /// Read `input` to its end. The front channel is closed on return,
    /// whether the input ended cleanly or with an error.
    pub async fn read<R>(&mut self, input: R) -> Result<ReadSummary, ShuttleError>
    where
        R: AsyncBufRead + Unpin,
    {
        let reader = self.reader.take().ok_or(ShuttleError::InputClosed)?;
        let result = reader.read(input).await;
        self.enter(ShutdownPhase::InputClosed);
        Ok(result?)
    }

    /// Drain every stage in order and stop the stats tasks.
    ///
    /// Everything admitted before this call is either delivered or counted as
    /// lost before it returns. Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> StatsSnapshot {
        if self.phase.is_terminated() {
            return self.stats.snapshot();
        }

        if self.phase == ShutdownPhase::Running {
            self.reader.take();
            self.enter(ShutdownPhase::InputClosed);
        }

        self.enter(ShutdownPhase::BatchersDraining);
        if let Some(batchers) = self.batchers.take() {
            batchers.wait().await;
        }

        self.back_tx.take();
        self.enter(ShutdownPhase::BatchChannelClosed);

        self.enter(ShutdownPhase::OutletsDraining);
        if let Some(outlets) = self.outlets.take() {
            outlets.wait().await;
        }

        self.observations_tx.take();
        if let Some(emitter) = self.emitter.take() {
            if let Err(e) = emitter.await {
                warn!(error = %e, "Stats emitter task failed");
            }
        }
        self.enter(ShutdownPhase::StatsChannelClosed);

        self.server_shutdown.cancel();
        if let Some(server) = self.server.take() {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Stats endpoint stopped with error"),
                Err(e) => warn!(error = %e, "Stats endpoint task failed"),
            }
        }
        self.enter(ShutdownPhase::Terminated);

        let snapshot = self.stats.snapshot();
        info!(
            input_lines = snapshot.input_lines,
            delivered_lines = snapshot.delivered_lines,
            drops = snapshot.drops,
            lost = snapshot.lost,
            "Shuttle shutdown complete"
        );
        snapshot
    }

    pub fn stats(&self) -> &ProgramStats {
        &self.stats
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    /// Bound address of the stats endpoint, if enabled.
    pub fn stats_addr(&self) -> Option<SocketAddr> {
        self.stats_addr
    }

    fn enter(&mut self, next: ShutdownPhase) {
        match self.phase.advance(next) {
            Ok(()) => info!(phase = %next, "Shutdown phase"),
            Err(e) => warn!(error = %e, "Ignoring shutdown transition"),
        }
    }
}

impl Drop for Shuttle {
    // Workers stop on their own once their channels close; the stats
    // endpoint only stops when told to.
    fn drop(&mut self) {
        self.server_shutdown.cancel();
    }
}
