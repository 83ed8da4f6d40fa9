use super::types::ShuttleConfig;
use crate::config::{env_var_pattern, expand_env_vars};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Read and parse a YAML config file. Missing keys keep their defaults. The
/// result is not validated, so that command-line overrides can be applied
/// first.
pub fn read_config(path: &Path) -> Result<ShuttleConfig, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let config = parse_config_str(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Validation(format!(
            "in file '{}': {}",
            path.display(),
            e
        )),
        other => other,
    })?;

    Ok(config)
}

/// Parse YAML text after `$env{VAR}` expansion. Does not validate.
pub fn parse_config_str(yaml: &str) -> Result<ShuttleConfig, ConfigError> {
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    // An empty document is a config with every default.
    if yaml.trim().is_empty() {
        return Ok(ShuttleConfig::default());
    }

    Ok(serde_yaml::from_str(&yaml)?)
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let mut unexpanded: Vec<String> = env_var_pattern()
        .captures_iter(yaml)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded.join(", ")
    )))
}

/// Check the config for values the pipeline cannot run with. All problems are
/// collected so the operator sees them at once.
pub fn validate_config(config: &ShuttleConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let positive = [
        ("front_buffer", config.front_buffer),
        ("back_buffer", config.back_buffer),
        ("num_batchers", config.num_batchers),
        ("num_outlets", config.num_outlets),
        ("batch_size", config.batch_size),
        ("stats.buffer", config.stats.buffer),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(format!("{} must be at least 1", name));
        }
    }

    if config.wait.is_zero() {
        errors.push("wait must be greater than zero".to_string());
    }
    if config.stats.interval.is_zero() {
        errors.push("stats.interval must be greater than zero".to_string());
    }
    if config.delivery.backoff_initial > config.delivery.backoff_max {
        errors.push(format!(
            "delivery.backoff_initial ({:?}) exceeds delivery.backoff_max ({:?})",
            config.delivery.backoff_initial, config.delivery.backoff_max
        ));
    }
    if config.delivery.timeout.is_zero() {
        errors.push("delivery.timeout must be greater than zero".to_string());
    }

    if let Err(e) = check_http_url(&config.delivery.logs_url) {
        errors.push(format!("delivery.logs_url: {}", e));
    }
    if let Some(url) = &config.stats.url {
        if let Err(e) = check_http_url(url) {
            errors.push(format!("stats.url: {}", e));
        }
    }

    if config.syslog.prival > 191 {
        errors.push(format!(
            "syslog.prival must be at most 191, got {}",
            config.syslog.prival
        ));
    }
    for (name, value) in [
        ("syslog.hostname", &config.syslog.hostname),
        ("syslog.appname", &config.syslog.appname),
        ("syslog.procid", &config.syslog.procid),
        ("syslog.msgid", &config.syslog.msgid),
    ] {
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            errors.push(format!("{} must be non-empty and contain no spaces", name));
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(ConfigError::Validation(errors.remove(0))),
        _ => Err(ConfigError::ValidationList(errors)),
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}' in '{}'", other, raw)),
    }
}
