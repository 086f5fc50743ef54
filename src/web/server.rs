//! Metrics server implementation using axum

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;

use crate::config::MetricsSettings;
use crate::metrics;

/// HTTP server exposing `/metrics` for Prometheus scrapes.
///
/// Runs on its own task so scrapes are answered while a poll blocks on
/// the portal.
pub struct MetricsServer {
    settings: MetricsSettings,
}

impl MetricsServer {
    /// Create a new metrics server
    pub fn new(settings: MetricsSettings) -> Self {
        Self { settings }
    }

    /// Start the server in a background task
    pub fn start(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Routes served by the metrics server
    pub fn router() -> Router {
        Router::new()
            .route("/metrics", get(metrics::serve_metrics))
            .route("/health", get(health))
    }

    async fn run(self) -> Result<()> {
        let port = self.settings.port;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind metrics server to {}", addr))?;

        tracing::info!("Metrics server listening on http://{}/metrics", addr);
        axum::serve(listener, Self::router()).await?;

        Ok(())
    }
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_metrics_endpoint_renders_gauges() {
        crate::metrics::init_metrics();
        crate::metrics::set_weight(bintally_core::Category::Black, 11.25);

        let response = MetricsServer::router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE bintally_bin_weight gauge"));
        assert!(text.contains(r#"bintally_bin_weight{category="black"} 11.25"#));
    }

    #[tokio::test]
    async fn test_health() {
        let response = MetricsServer::router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = MetricsServer::router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
