use crate::stats::counters::{ProgramStats, StatsSnapshot};
use crate::stats::StatsError;
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Json, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the stats router:
/// - `GET /stats`: plain text, one `log_shuttle.<name> <value>` per line
/// - `GET /stats.json`: the same snapshot as JSON
/// - `GET /health`
pub fn stats_router(stats: ProgramStats) -> Router {
    Router::new()
        .route("/stats", get(get_stats_text))
        .route("/stats.json", get(get_stats_json))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(stats)
}

/// Bind the stats listener. Called during startup so a bad address is fatal
/// before any input is read.
pub async fn bind_stats_listener(addr: SocketAddr) -> Result<TcpListener, StatsError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StatsError::Bind { addr, source })
}

/// Serve the stats router until `shutdown` is cancelled.
pub async fn serve_stats(
    listener: TcpListener,
    stats: ProgramStats,
    shutdown: CancellationToken,
) -> Result<(), StatsError> {
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Stats endpoint listening");

    axum::serve(listener, stats_router(stats))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Stats endpoint shutting down");
        })
        .await?;

    Ok(())
}

async fn get_stats_text(State(stats): State<ProgramStats>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        stats.snapshot().render_text(),
    )
}

async fn get_stats_json(State(stats): State<ProgramStats>) -> Json<StatsSnapshot> {
    Json(stats.snapshot())
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_stats_text_endpoint() {
        let stats = ProgramStats::new();
        stats.reader().line_read();
        stats.reader().line_read();
        stats.reader().line_dropped();

        let response = stats_router(stats)
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("log_shuttle.input_lines 2\n"));
        assert!(text.contains("log_shuttle.reader_drops 1\n"));
        assert!(text.contains("log_shuttle.drops 1\n"));
    }

    #[tokio::test]
    async fn test_stats_json_endpoint() {
        let stats = ProgramStats::new();
        stats.batcher().batch_created(3);

        let response = stats_router(stats)
            .oneshot(
                Request::builder()
                    .uri("/stats.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["batches_created"], 1);
        assert_eq!(json["batched_lines"], 3);
        assert!(json["latency"].is_null());
    }

    #[tokio::test]
    async fn test_bind_failure_reported() {
        let first = bind_stats_listener("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let taken = first.local_addr().unwrap();

        let second = bind_stats_listener(taken).await;
        assert!(matches!(second, Err(StatsError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = bind_stats_listener("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(serve_stats(listener, ProgramStats::new(), token.clone()));

        token.cancel();
        handle.await.unwrap().unwrap();
    }
}
