//! HTTP endpoint for serving metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::registry::MetricRegistry;
use crate::error::{HddPowerError, Result};

/// HTTP endpoint serving `/metrics` and `/health`
#[derive(Debug)]
pub struct MetricsEndpoint {
    registry: Arc<MetricRegistry>,
    bind_addr: SocketAddr,
    local_addr: Option<SocketAddr>,
    server_handle: Option<JoinHandle<()>>,
}

impl MetricsEndpoint {
    /// Create a new metrics endpoint
    pub fn new(registry: Arc<MetricRegistry>, bind_addr: SocketAddr) -> Self {
        Self {
            registry,
            bind_addr,
            local_addr: None,
            server_handle: None,
        }
    }

    /// Bind the listener and start serving in a background task
    ///
    /// Binding errors (e.g. port already in use) are returned to the caller.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.server_handle.is_some() {
            return Err(HddPowerError::Server("Server already started".to_string()));
        }

        let app = create_app(self.registry.clone());
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        info!("Starting metrics endpoint server on {}", local_addr);

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Metrics endpoint server error: {}", e);
            }
        });

        self.local_addr = Some(local_addr);
        self.server_handle = Some(server_handle);
        Ok(local_addr)
    }

    /// Stop the HTTP server
    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.local_addr = None;
    }

    /// Address the server is listening on, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Get the metrics URL
    pub fn metrics_url(&self) -> String {
        format!("http://{}/metrics", self.local_addr.unwrap_or(self.bind_addr))
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }
}

impl Drop for MetricsEndpoint {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

/// Create the Axum application
fn create_app(registry: Arc<MetricRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(registry): State<Arc<MetricRegistry>>) -> Response {
    match registry.render() {
        Ok(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get metrics").into_response()
        }
    }
}

/// Handler for /health endpoint
async fn health_handler(State(registry): State<Arc<MetricRegistry>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "encoding": registry.encoding().to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Encoding;
    use crate::power::PowerState;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_endpoint_start_stop() {
        let registry = Arc::new(MetricRegistry::new(Encoding::Ordinal).unwrap());
        let mut endpoint = MetricsEndpoint::new(registry, loopback());
        assert!(!endpoint.is_running());

        let addr = endpoint.start().await.unwrap();
        assert!(endpoint.is_running());
        assert_ne!(addr.port(), 0);
        assert!(endpoint.metrics_url().ends_with("/metrics"));
        assert!(endpoint.start().await.is_err());

        endpoint.stop().await;
        assert!(!endpoint.is_running());
        assert!(endpoint.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let registry = Arc::new(MetricRegistry::new(Encoding::OneHot).unwrap());
        registry.update("/dev/sda", &PowerState::Standby).unwrap();

        let mut endpoint = MetricsEndpoint::new(registry.clone(), loopback());
        let addr = endpoint.start().await.unwrap();

        let response = get(addr, "/metrics").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#"hdd_power_state{dev="/dev/sda",state="standby"} 1"#));

        // Scrapes see updates made after the server started
        registry.update("/dev/sda", &PowerState::Idle).unwrap();
        let response = get(addr, "/metrics").await;
        assert!(response.contains(r#"hdd_power_state{dev="/dev/sda",state="standby"} 0"#));
        assert!(response.contains(r#"hdd_power_state{dev="/dev/sda",state="idle"} 1"#));

        endpoint.stop().await;
    }

    #[tokio::test]
    async fn test_health_route() {
        let registry = Arc::new(MetricRegistry::new(Encoding::Ordinal).unwrap());
        let mut endpoint = MetricsEndpoint::new(registry, loopback());
        let addr = endpoint.start().await.unwrap();

        let response = get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""status":"healthy""#));
        assert!(response.contains(r#""encoding":"ordinal""#));

        endpoint.stop().await;
    }

    #[tokio::test]
    async fn test_port_in_use() {
        let registry = Arc::new(MetricRegistry::new(Encoding::Ordinal).unwrap());
        let mut first = MetricsEndpoint::new(registry.clone(), loopback());
        let addr = first.start().await.unwrap();

        let mut second = MetricsEndpoint::new(registry, addr);
        assert!(matches!(second.start().await, Err(HddPowerError::Io(_))));

        first.stop().await;
    }
}
