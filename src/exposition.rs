//! Pull-based `/metrics` endpoint.
//!
//! Serves the registry in the Prometheus text format. Runs as its own
//! tokio task next to the collector loop; the two share nothing but
//! the registry.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{Registry, TextEncoder};

/// Router exposing `GET /metrics` for `registry`.
pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(registry)
}

async fn render_metrics(State(registry): State<Registry>) -> Response {
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&registry.gather()) {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Binds `0.0.0.0:<port>` and serves until the process ends.
///
/// Returns only on bind or serve failure.
pub async fn serve(port: u16, registry: Registry) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics endpoint on {addr}"))?;

    log::info!("serving metrics on http://{}/metrics", addr);

    axum::serve(listener, router(registry))
        .await
        .context("metrics endpoint stopped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Gauge, MetricsSink, PrometheusSink};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn metrics_route_renders_gauges() {
        let registry = Registry::new();
        let sink = PrometheusSink::register(&registry).unwrap();
        sink.record(Gauge::UserRank, &["nova"], 5.0);

        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = router(registry).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("spacetraderinventory_userrank{username=\"nova\"} 5"));
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = router(Registry::new()).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
