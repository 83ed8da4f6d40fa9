use crate::cli::Cli;
use crate::config::ShuttleConfig;
use crate::logging::init_tracing;
use crate::outlet::HttpDeliverer;
use crate::shuttle::{Shuttle, ShuttleError};
use crate::stats::{HttpStatsSink, LogStatsSink, StatsSink, StatsSnapshot};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

/// Merge the configuration and install the tracing subscriber. Failures here
/// happen before any subscriber exists, so callers report them on stderr.
pub fn prepare(cli: &Cli) -> Result<ShuttleConfig, ShuttleError> {
    let config = cli.load_config()?;
    init_tracing(config.log_to_syslog)?;
    Ok(config)
}

/// Forward stdin until it is exhausted, then drain and stop.
pub async fn run(config: ShuttleConfig) -> Result<StatsSnapshot, ShuttleError> {
    if std::io::stdin().is_terminal() {
        return Err(ShuttleError::NoStdin);
    }

    let deliverer = HttpDeliverer::new(&config.delivery, &config.syslog)?;
    info!(url = %deliverer.url(), "Delivering logs");

    let sink: Arc<dyn StatsSink> = match &config.stats.url {
        Some(url) => Arc::new(HttpStatsSink::new(url.clone(), config.delivery.timeout)?),
        None => Arc::new(LogStatsSink),
    };

    let mut shuttle = Shuttle::start(&config, Arc::new(deliverer), sink).await?;

    let read = shuttle.read(BufReader::new(tokio::io::stdin())).await;
    // Drain whatever was admitted even if reading failed part way.
    let snapshot = shuttle.shutdown().await;
    read?;

    Ok(snapshot)
}
