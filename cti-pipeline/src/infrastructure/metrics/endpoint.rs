// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A deliberately minimal `/metrics` + `/health` HTTP server: raw TCP,
//! no HTTP framework, since Prometheus scraping and load-balancer health
//! probes are the only two clients that will ever hit this port.

use crate::infrastructure::metrics::service::MetricsService;
use cti_pipeline_domain::PipelineError;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub struct MetricsEndpoint {
    metrics: Arc<MetricsService>,
}

impl MetricsEndpoint {
    pub fn new(metrics: Arc<MetricsService>) -> Self {
        Self { metrics }
    }

    /// Runs until `shutdown` is cancelled. Each accepted connection is
    /// handled on its own task so one slow client can't stall the next.
    pub async fn run(&self, bind_addr: &str, shutdown: cti_pipeline_bootstrap::CancellationToken) -> Result<(), PipelineError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| PipelineError::IoError(format!("failed to bind metrics endpoint on {bind_addr}: {e}")))?;
        info!(%bind_addr, "metrics endpoint listening");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    match accepted {
                        Ok((mut stream, _)) => {
                            let metrics = self.metrics.clone();
                            tokio::spawn(async move {
                                if let Err(err) = handle_request(&mut stream, &metrics).await {
                                    error!(error = %err, "error handling metrics request");
                                }
                            });
                        }
                        Err(err) => error!(error = %err, "error accepting metrics connection"),
                    }
                }
            }
        }
    }
}

async fn handle_request(stream: &mut tokio::net::TcpStream, metrics: &MetricsService) -> Result<(), std::io::Error> {
    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);
    debug!(line = request.lines().next().unwrap_or(""), "metrics endpoint request");

    if request.starts_with("GET /metrics") {
        match metrics.render() {
            Ok(body) => write_response(stream, 200, "OK", "text/plain; version=0.0.4; charset=utf-8", &body).await?,
            Err(err) => write_response(stream, 500, "Internal Server Error", "text/plain", &format!("error rendering metrics: {err}")).await?,
        }
    } else if request.starts_with("GET /health") {
        write_response(stream, 200, "OK", "text/plain", "OK").await?;
    } else {
        write_response(stream, 404, "Not Found", "text/plain", "Not Found").await?;
    }

    stream.flush().await
}

async fn write_response(stream: &mut tokio::net::TcpStream, status: u16, reason: &str, content_type: &str, body: &str) -> Result<(), std::io::Error> {
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn serves_metrics_and_health_over_a_real_connection() {
        let metrics = Arc::new(MetricsService::new().unwrap());
        metrics.record_quarantine("filter");
        let endpoint = Arc::new(MetricsEndpoint::new(metrics));
        let coordinator = cti_pipeline_bootstrap::ShutdownCoordinator::new(std::time::Duration::from_secs(1));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint_clone = endpoint.clone();
        let token = coordinator.token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    accepted = listener.accept() => {
                        if let Ok((mut stream, _)) = accepted {
                            let metrics = endpoint_clone.metrics.clone();
                            tokio::spawn(async move { let _ = handle_request(&mut stream, &metrics).await; });
                        }
                    }
                }
            }
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /metrics HTTP/1.1\r\n\r\n").await.unwrap();
        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await.unwrap();
        response.extend_from_slice(&buf[..n]);
        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("cti_pipeline_quarantine_total"));

        coordinator.initiate_shutdown();
    }

    #[tokio::test]
    async fn unknown_path_returns_404_through_the_full_run_loop() {
        let metrics = Arc::new(MetricsService::new().unwrap());
        let endpoint = MetricsEndpoint::new(metrics);
        let coordinator = cti_pipeline_bootstrap::ShutdownCoordinator::new(std::time::Duration::from_secs(1));
        let token = coordinator.token();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let run_handle = tokio::spawn(async move { endpoint.run(&addr.to_string(), token).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /unknown HTTP/1.1\r\n\r\n").await.unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        let response = String::from_utf8_lossy(&buf[..n]);
        assert!(response.starts_with("HTTP/1.1 404 Not Found"));

        coordinator.initiate_shutdown();
        run_handle.await.unwrap().unwrap();
    }
}
