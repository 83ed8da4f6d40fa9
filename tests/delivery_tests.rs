/// HTTP delivery tests against an in-process mock endpoint.
///
/// Covers:
/// - Request framing and headers
/// - Retry exhaustion against an endpoint that always fails
/// - Stats pushes to a JSON sink
/// - The pull endpoint of a running shuttle
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use log_shuttle::config::{InputFormat, ShuttleConfig};
use log_shuttle::outlet::HttpDeliverer;
use log_shuttle::shuttle::Shuttle;
use log_shuttle::stats::{HttpStatsSink, LogStatsSink};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct MockEndpoint {
        status: StatusCode,
        requests: Arc<Mutex<Vec<(HeaderMap, Bytes)>>>,
    }

    impl MockEndpoint {
        fn new(status: StatusCode) -> Self {
            Self {
                status,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    async fn record(
        State(endpoint): State<MockEndpoint>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        endpoint.requests.lock().unwrap().push((headers, body));
        endpoint.status
    }

    /// Helper: serve the mock on an ephemeral port
    async fn spawn_endpoint(endpoint: MockEndpoint) -> SocketAddr {
        let router = Router::new()
            .route("/logs", post(record))
            .route("/stats", post(record))
            .with_state(endpoint);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn config_for(addr: SocketAddr) -> ShuttleConfig {
        let mut config = ShuttleConfig::default();
        config.delivery.logs_url = format!("http://{}/logs", addr);
        config.delivery.backoff_initial = Duration::from_millis(1);
        config.delivery.backoff_max = Duration::from_millis(5);
        config.batch_size = 2;
        config.num_batchers = 1;
        config.num_outlets = 1;
        config.wait = Duration::from_secs(30);
        config.syslog.hostname = "web1".to_string();
        config.syslog.appname = "app".to_string();
        config
    }

    async fn start(config: &ShuttleConfig) -> Shuttle {
        let deliverer = HttpDeliverer::new(&config.delivery, &config.syslog).unwrap();
        Shuttle::start(config, Arc::new(deliverer), Arc::new(LogStatsSink))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_batches_posted_as_octet_counted_frames() {
        let endpoint = MockEndpoint::new(StatusCode::OK);
        let addr = spawn_endpoint(endpoint.clone()).await;
        let config = config_for(addr);

        let mut shuttle = start(&config).await;
        shuttle.read(&b"hello\nworld\nagain\n"[..]).await.unwrap();
        let snapshot = shuttle.shutdown().await;

        assert_eq!(snapshot.delivered_lines, 3);
        assert_eq!(endpoint.count(), 2);

        let requests = endpoint.requests.lock().unwrap();
        let mut counts: Vec<String> = requests
            .iter()
            .map(|(headers, _)| {
                assert_eq!(headers["content-type"], "application/logplex-1");
                assert!(headers.contains_key("logshuttle-batch-id"));
                headers["logplex-msg-count"].to_str().unwrap().to_string()
            })
            .collect();
        counts.sort();
        assert_eq!(counts, vec!["1", "2"]);

        let full = requests
            .iter()
            .find(|(headers, _)| headers["logplex-msg-count"] == "2")
            .map(|(_, body)| String::from_utf8(body.to_vec()).unwrap())
            .unwrap();
        assert!(full.contains(" web1 app shuttle - - hello"));
        assert!(full.ends_with(" web1 app shuttle - - world"));

        let (len, frame) = full.split_once(' ').unwrap();
        let len: usize = len.parse().unwrap();
        assert!(frame[..len].starts_with("<190>1 "));
        assert!(frame[..len].ends_with("hello"));
    }

    #[tokio::test]
    async fn test_rfc5424_lines_forwarded_verbatim() {
        let endpoint = MockEndpoint::new(StatusCode::OK);
        let addr = spawn_endpoint(endpoint.clone()).await;
        let mut config = config_for(addr);
        config.syslog.input_format = InputFormat::Rfc5424;

        let line = "<13>1 2024-01-01T00:00:00Z host app 1 - - payload";
        let mut shuttle = start(&config).await;
        shuttle
            .read(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
        shuttle.shutdown().await;

        let requests = endpoint.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, format!("{} {}", line.len(), line).into_bytes());
    }

    #[tokio::test]
    async fn test_failing_endpoint_exhausts_retries() {
        let endpoint = MockEndpoint::new(StatusCode::INTERNAL_SERVER_ERROR);
        let addr = spawn_endpoint(endpoint.clone()).await;
        let mut config = config_for(addr);
        config.delivery.max_retries = 2;

        let mut shuttle = start(&config).await;
        shuttle.read(&b"a\nb\n"[..]).await.unwrap();
        let snapshot = shuttle.shutdown().await;

        assert_eq!(endpoint.count(), 3);
        assert_eq!(snapshot.delivery_attempts, 3);
        assert_eq!(snapshot.lost_batches, 1);
        assert_eq!(snapshot.lost_lines, 2);
        assert_eq!(snapshot.delivered_lines, 0);
    }

    #[tokio::test]
    async fn test_final_stats_pushed_on_shutdown() {
        let logs = MockEndpoint::new(StatusCode::OK);
        let stats_sink = MockEndpoint::new(StatusCode::OK);
        let logs_addr = spawn_endpoint(logs.clone()).await;
        let stats_addr = spawn_endpoint(stats_sink.clone()).await;

        let mut config = config_for(logs_addr);
        config.stats.source = "test-source".to_string();
        config.stats.interval = Duration::from_secs(3600);

        let deliverer = HttpDeliverer::new(&config.delivery, &config.syslog).unwrap();
        let sink = HttpStatsSink::new(
            format!("http://{}/stats", stats_addr),
            Duration::from_secs(5),
        )
        .unwrap();
        let mut shuttle = Shuttle::start(&config, Arc::new(deliverer), Arc::new(sink))
            .await
            .unwrap();
        shuttle.read(&b"one\ntwo\n"[..]).await.unwrap();
        shuttle.shutdown().await;

        let requests = stats_sink.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let report: serde_json::Value = serde_json::from_slice(&requests[0].1).unwrap();
        assert_eq!(report["source"], "test-source");
        assert_eq!(report["input_lines"], 2);
        assert_eq!(report["delivered_lines"], 2);
        assert_eq!(report["latency"]["count"], 1);
    }

    #[tokio::test]
    async fn test_pull_endpoint_serves_counters() {
        let endpoint = MockEndpoint::new(StatusCode::OK);
        let addr = spawn_endpoint(endpoint.clone()).await;
        let mut config = config_for(addr);
        config.stats.addr = Some("127.0.0.1:0".parse().unwrap());

        let mut shuttle = start(&config).await;
        shuttle.read(&b"x\ny\nz\n"[..]).await.unwrap();

        let stats_addr = shuttle.stats_addr().unwrap();
        let body = reqwest::get(format!("http://{}/stats", stats_addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.lines().any(|l| l == "log_shuttle.input_lines 3"));

        shuttle.shutdown().await;
        assert!(reqwest::get(format!("http://{}/health", stats_addr))
            .await
            .is_err());
    }
}
