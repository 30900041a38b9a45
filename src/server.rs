use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::health::HealthChecker;
use crate::prometheus_metrics::PrometheusMetrics;
use crate::scanner::Scanner;

/// Minimal HTTP/1.1 status server over a raw tokio listener.
pub struct StatusServer {
    scanner: Arc<Scanner>,
    health: Arc<HealthChecker>,
    prometheus: Arc<PrometheusMetrics>,
    port: u16,
}

impl StatusServer {
    pub fn new(
        scanner: Arc<Scanner>,
        health: Arc<HealthChecker>,
        prometheus: Arc<PrometheusMetrics>,
        port: u16,
    ) -> Self {
        Self {
            scanner,
            health,
            prometheus,
            port,
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(format!("127.0.0.1:{}", self.port)).await?;
        info!(port = self.port, "status server listening");

        loop {
            let (mut socket, _) = listener.accept().await?;
            let scanner = Arc::clone(&self.scanner);
            let health = Arc::clone(&self.health);
            let prometheus = Arc::clone(&self.prometheus);

            tokio::spawn(async move {
                let mut buffer = [0u8; 1024];
                let n = match socket.read(&mut buffer).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };

                let request = String::from_utf8_lossy(&buffer[..n]).into_owned();
                let response =
                    Self::handle_request(&request, scanner, &health, &prometheus).await;

                if socket.write_all(response.as_bytes()).await.is_err() {
                    warn!("failed to write status response");
                }
            });
        }
    }

    async fn handle_request(
        request: &str,
        scanner: Arc<Scanner>,
        health: &HealthChecker,
        prometheus: &PrometheusMetrics,
    ) -> String {
        let Some(request_line) = request.lines().next() else {
            return Self::error_response(400, "Bad Request");
        };
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 {
            return Self::error_response(400, "Bad Request");
        }

        match (parts[0], parts[1]) {
            ("GET", "/health") => {
                let body = health.get_health();
                let status = if health.is_healthy() { 200 } else { 503 };
                match serde_json::to_string(&body) {
                    Ok(json) => Self::json_response(status, &json),
                    Err(_) => Self::error_response(500, "Internal Server Error"),
                }
            }
            ("GET", "/stats") => {
                // The snapshot may call out to the oracle; keep it off the
                // runtime threads.
                let snapshot =
                    tokio::task::spawn_blocking(move || scanner.snapshot()).await;
                match snapshot {
                    Ok(snapshot) => match serde_json::to_string(&snapshot) {
                        Ok(json) => Self::json_response(200, &json),
                        Err(_) => Self::error_response(500, "Internal Server Error"),
                    },
                    Err(_) => Self::error_response(500, "Internal Server Error"),
                }
            }
            ("GET", "/metrics") => {
                let snapshot =
                    tokio::task::spawn_blocking(move || scanner.snapshot()).await;
                let Ok(snapshot) = snapshot else {
                    return Self::error_response(500, "Internal Server Error");
                };
                prometheus.update_from_snapshot(&snapshot);
                match prometheus.export() {
                    Ok(text) => Self::text_response(200, &text),
                    Err(_) => Self::error_response(500, "Internal Server Error"),
                }
            }
            ("GET", "/") => Self::text_response(
                200,
                "wallet-scanner status endpoints: /health /stats /metrics\n",
            ),
            _ => Self::error_response(404, "Not Found"),
        }
    }

    fn json_response(status: u16, body: &str) -> String {
        format!(
            "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn text_response(status: u16, body: &str) -> String {
        format!(
            "HTTP/1.1 {} OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn error_response(status: u16, message: &str) -> String {
        let body = format!("{{\"error\": \"{message}\"}}");
        Self::json_response(status, &body)
    }
}
