/// Configuration layering tests: defaults, YAML file, command-line flags.
use clap::Parser;
use log_shuttle::cli::{self, Cli};
use log_shuttle::shuttle::ShuttleError;
use log_shuttle::config::{ConfigError, InputFormat, ShuttleConfig};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["log-shuttle"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_flags_override_file_values() {
        let file = write_config(
            r#"
batch_size: 50
wait: 1s
delivery:
  logs_url: https://logs.example.com/logs
  max_retries: 7
syslog:
  appname: from-file
"#,
        );
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path, "--batch-size", "5", "--appname", "from-flag"])
            .load_config()
            .unwrap();

        assert_eq!(config.batch_size, 5);
        assert_eq!(config.syslog.appname, "from-flag");
        assert_eq!(config.wait, Duration::from_secs(1));
        assert_eq!(config.delivery.logs_url, "https://logs.example.com/logs");
        assert_eq!(config.delivery.max_retries, 7);
        assert_eq!(config.num_outlets, ShuttleConfig::default().num_outlets);
    }

    #[test]
    fn test_env_vars_expanded_in_file() {
        std::env::set_var("SHUTTLE_IT_LOGS_URL", "http://collector.internal/logs");
        let file = write_config("delivery:\n  logs_url: $env{SHUTTLE_IT_LOGS_URL}\n");

        let config = parse(&["--config", file.path().to_str().unwrap()])
            .load_config()
            .unwrap();
        assert_eq!(config.delivery.logs_url, "http://collector.internal/logs");
    }

    #[test]
    fn test_unset_env_var_is_an_error() {
        let file = write_config("delivery:\n  logs_url: $env{SHUTTLE_IT_DEFINITELY_UNSET}\n");
        let result = parse(&["--config", file.path().to_str().unwrap()]).load_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_flag_can_fix_invalid_file_value() {
        let file = write_config("batch_size: 0\n");
        let path = file.path().to_str().unwrap();

        assert!(matches!(
            parse(&["--config", path]).load_config(),
            Err(ConfigError::Validation(_))
        ));
        let config = parse(&["--config", path, "--batch-size", "3"])
            .load_config()
            .unwrap();
        assert_eq!(config.batch_size, 3);
    }

    #[test]
    fn test_invalid_flags_rejected_after_merge() {
        let file = write_config("");
        let path = file.path().to_str().unwrap();

        let result = parse(&[
            "--config",
            path,
            "--logs-url",
            "ftp://nope",
            "--backoff",
            "20s",
            "--backoff-max",
            "1s",
        ])
        .load_config();

        match result {
            Err(ConfigError::ValidationList(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = parse(&["--config", "/nonexistent/log-shuttle.yml"]).load_config();
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_input_format_flag() {
        let file = write_config("syslog:\n  input_format: raw\n");
        let config = parse(&[
            "--config",
            file.path().to_str().unwrap(),
            "--input-format",
            "rfc5424",
        ])
        .load_config()
        .unwrap();
        assert_eq!(config.syslog.input_format, InputFormat::Rfc5424);
    }

    #[test]
    fn test_prepare_reports_invalid_config() {
        let file = write_config("front_buffer: 0\n");
        let result = cli::prepare(&parse(&["--config", file.path().to_str().unwrap()]));
        assert!(matches!(result, Err(ShuttleError::Config(_))));
    }
}
