use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Immutable runtime configuration, built once at startup.
///
/// Every field has a default so a partial YAML file (or none at all) is valid;
/// command-line flags are layered on top by the cli module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShuttleConfig {
    /// Capacity of the Reader → Batcher channel, in lines.
    pub front_buffer: usize,
    /// Capacity of the Batcher → Outlet channel, in batches.
    pub back_buffer: usize,
    pub num_batchers: usize,
    pub num_outlets: usize,
    /// Maximum number of lines in a batch.
    pub batch_size: usize,
    /// Maximum time a batch stays open after its first line.
    #[serde(with = "humantime_serde")]
    pub wait: Duration,
    /// Bounded wait applied before an admission drop.
    #[serde(with = "humantime_serde")]
    pub drop_patience: Duration,

    pub delivery: DeliveryConfig,
    pub syslog: SyslogConfig,
    pub stats: StatsConfig,

    pub log_to_syslog: bool,
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        Self {
            front_buffer: 1000,
            back_buffer: 50,
            num_batchers: 2,
            num_outlets: 4,
            batch_size: 500,
            wait: Duration::from_millis(250),
            drop_patience: Duration::ZERO,
            delivery: DeliveryConfig::default(),
            syslog: SyslogConfig::default(),
            stats: StatsConfig::default(),
            log_to_syslog: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    pub logs_url: String,
    /// Retries after the first failed attempt.
    pub max_retries: usize,
    #[serde(with = "humantime_serde")]
    pub backoff_initial: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
    /// Per-request HTTP timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            logs_url: "http://localhost:8080/logs".to_string(),
            max_retries: 2,
            backoff_initial: Duration::from_millis(100),
            backoff_max: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Header fields used when framing raw input lines as syslog messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyslogConfig {
    pub input_format: InputFormat,
    pub prival: u8,
    pub hostname: String,
    pub appname: String,
    pub procid: String,
    pub msgid: String,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "shuttle".to_string());

        Self {
            input_format: InputFormat::Raw,
            prival: 190,
            hostname,
            appname: "token".to_string(),
            procid: "shuttle".to_string(),
            msgid: "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Plain text lines; a syslog header is added on delivery.
    Raw,
    /// Lines are already RFC 5424 frames and are forwarded verbatim.
    Rfc5424,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    /// Listen address of the pull endpoint; `None` disables it.
    pub addr: Option<SocketAddr>,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Source tag attached to every pushed snapshot.
    pub source: String,
    /// Push sink; without one snapshots are only logged.
    pub url: Option<String>,
    /// Capacity of the latency observation channel.
    pub buffer: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            addr: None,
            interval: Duration::from_secs(60),
            source: String::new(),
            url: None,
            buffer: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
batch_size: 10
wait: 2s
delivery:
  max_retries: 5
"#;
        let config: ShuttleConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.wait, Duration::from_secs(2));
        assert_eq!(config.delivery.max_retries, 5);
        assert_eq!(config.delivery.timeout, Duration::from_secs(5));
        assert_eq!(config.front_buffer, 1000);
        assert_eq!(config.syslog.input_format, InputFormat::Raw);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ShuttleConfig, _> = serde_yaml::from_str("bogus: 1\n");
        assert!(result.is_err());
    }
}
