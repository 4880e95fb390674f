//! HTTP endpoints: the metrics path and a landing page.

use crate::{
    core::domain::error::{ExporterResult, ValidationError},
    exporter::Exporter,
};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};
use std::sync::Arc;
use tracing::error;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub exporter: Arc<Exporter>,
    pub metrics_path: String,
}

/// Creates the router serving `metrics_path` and the landing page at `/`.
///
/// # Errors
/// Returns a validation error if `metrics_path` does not start with `/`.
pub fn create_router(exporter: Arc<Exporter>, metrics_path: &str) -> ExporterResult<Router> {
    if !metrics_path.starts_with('/') {
        return Err(ValidationError::Field {
            field: "telemetry-path".to_string(),
            message: format!("path must start with '/': {:?}", metrics_path),
        }
        .into());
    }

    let mut router = Router::new().route(metrics_path, get(metrics_handler));
    if metrics_path != "/" {
        router = router.route("/", get(landing_handler));
    }

    Ok(router.with_state(Arc::new(HttpState {
        exporter,
        metrics_path: metrics_path.to_string(),
    })))
}

/// Runs a collection cycle and returns the Prometheus text format.
async fn metrics_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    match state.exporter.render().await {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            output,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Encoding metrics failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn landing_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Html(landing_page(&state.metrics_path))
}

fn landing_page(metrics_path: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en-US">
<head>
    <meta http-equiv="Content-Type" content="text/html; charset=utf-8">
    <title>GridServer Exporter for Prometheus</title>
</head>
<body>
    <h1>GridServer Exporter for Prometheus</h1>
    <p><a href="{}">Metrics</a></p>
</body>
</html>
"#,
        metrics_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::infrastructure::mock_collector::MockCollector;
    use tokio::net::TcpListener;

    async fn spawn_server(metrics_path: &str) -> String {
        let exporter = Exporter::new(Box::new(MockCollector::new(Some(1)))).unwrap();
        let router = create_router(Arc::new(exporter), metrics_path).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let base = spawn_server("/metrics").await;
        let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
        let body = response.text().await.unwrap();
        assert!(body.contains("gridserver_up 1"));
        assert!(body.contains("gridserver_grid_total_engines"));
    }

    #[tokio::test]
    async fn test_landing_page_links_metrics() {
        let base = spawn_server("/custom").await;
        let body = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert!(body.contains(r#"<a href="/custom">Metrics</a>"#));
    }

    #[test]
    fn test_relative_metrics_path_is_rejected() {
        let exporter = Exporter::new(Box::new(MockCollector::new(None))).unwrap();
        let result = create_router(Arc::new(exporter), "metrics");
        assert!(matches!(result, Err(e) if e.is_validation()));
    }
}
