use crate::config::{read_config, resolve_config_path, validate_config, ConfigError};
use crate::config::{InputFormat, ShuttleConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line flags. Every flag is optional and, when given, overrides the
/// value from the config file (or the built-in default).
#[derive(Debug, Default, Parser)]
#[command(name = "log-shuttle", version)]
#[command(about = "Batch stdin log lines and deliver them over HTTP", long_about = None)]
pub struct Cli {
    /// YAML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Capacity of the line buffer between the reader and the batchers
    #[arg(long = "front-buff")]
    pub front_buffer: Option<usize>,

    /// Capacity of the batch buffer between the batchers and the outlets
    #[arg(long = "back-buff")]
    pub back_buffer: Option<usize>,

    #[arg(long)]
    pub num_batchers: Option<usize>,

    #[arg(long)]
    pub num_outlets: Option<usize>,

    /// Maximum lines per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum time a batch stays open after its first line (e.g. 250ms)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub wait: Option<Duration>,

    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Initial retry backoff, doubled after each failed attempt
    #[arg(long, value_parser = humantime::parse_duration)]
    pub backoff: Option<Duration>,

    #[arg(long, value_parser = humantime::parse_duration)]
    pub backoff_max: Option<Duration>,

    /// HTTP request timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// How long to wait on a full buffer before dropping
    #[arg(long, value_parser = humantime::parse_duration)]
    pub drop_patience: Option<Duration>,

    /// Serve counters over HTTP on this address
    #[arg(long)]
    pub stats_addr: Option<SocketAddr>,

    #[arg(long, value_parser = humantime::parse_duration)]
    pub stats_interval: Option<Duration>,

    /// Source tag for pushed stats
    #[arg(long)]
    pub stats_source: Option<String>,

    /// Push stats to this URL
    #[arg(long)]
    pub stats_url: Option<String>,

    /// Delivery endpoint
    #[arg(long)]
    pub logs_url: Option<String>,

    #[arg(long, value_enum)]
    pub input_format: Option<InputFormat>,

    #[arg(long)]
    pub prival: Option<u8>,

    #[arg(long)]
    pub appname: Option<String>,

    #[arg(long)]
    pub hostname: Option<String>,

    #[arg(long)]
    pub procid: Option<String>,

    #[arg(long)]
    pub msgid: Option<String>,

    /// Send diagnostics to the local syslog daemon instead of stderr
    #[arg(long)]
    pub log_to_syslog: bool,
}

impl Cli {
    /// Defaults, then the config file if one is found, then flags. The
    /// merged result is validated as a whole.
    pub fn load_config(&self) -> Result<ShuttleConfig, ConfigError> {
        let mut config = match resolve_config_path(self.config.as_deref()) {
            Some(path) => read_config(&path)?,
            None => ShuttleConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config)?;
        Ok(config)
    }

    /// Overwrite every field for which a flag was given.
    pub fn apply(&self, config: &mut ShuttleConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.front_buffer, &self.front_buffer);
        set(&mut config.back_buffer, &self.back_buffer);
        set(&mut config.num_batchers, &self.num_batchers);
        set(&mut config.num_outlets, &self.num_outlets);
        set(&mut config.batch_size, &self.batch_size);
        set(&mut config.wait, &self.wait);
        set(&mut config.drop_patience, &self.drop_patience);

        set(&mut config.delivery.logs_url, &self.logs_url);
        set(&mut config.delivery.max_retries, &self.max_retries);
        set(&mut config.delivery.backoff_initial, &self.backoff);
        set(&mut config.delivery.backoff_max, &self.backoff_max);
        set(&mut config.delivery.timeout, &self.timeout);

        set(&mut config.syslog.input_format, &self.input_format);
        set(&mut config.syslog.prival, &self.prival);
        set(&mut config.syslog.appname, &self.appname);
        set(&mut config.syslog.hostname, &self.hostname);
        set(&mut config.syslog.procid, &self.procid);
        set(&mut config.syslog.msgid, &self.msgid);

        if self.stats_addr.is_some() {
            config.stats.addr = self.stats_addr;
        }
        if self.stats_url.is_some() {
            config.stats.url = self.stats_url.clone();
        }
        set(&mut config.stats.interval, &self.stats_interval);
        set(&mut config.stats.source, &self.stats_source);

        if self.log_to_syslog {
            config.log_to_syslog = true;
        }
    }
}
