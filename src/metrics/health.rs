//! Health check endpoint and Prometheus metrics server
//!
//! A small Axum server exposing `/health` and `/metrics`, run alongside
//! the simulation driver and shut down over a broadcast channel.

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::metrics::collector::MetricsCollector;

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Shared state for the health endpoints
#[derive(Clone)]
struct HealthServerState {
    collector: Arc<MetricsCollector>,
    service_name: String,
    started: Instant,
}

/// HTTP server exposing health and metrics
pub struct HealthServer {
    config: HealthServerConfig,
    state: HealthServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    pub fn new(
        config: HealthServerConfig,
        collector: Arc<MetricsCollector>,
        service_name: String,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            state: HealthServerState {
                collector,
                service_name,
                started: Instant::now(),
            },
            shutdown_tx,
        }
    }

    /// Serve until a shutdown signal arrives
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("invalid health server address")?;

        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone());

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding health server to {addr}"))?;
        info!("health server listening on http://{addr}");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("health server shutting down");
            })
            .await
            .context("health server error")?;

        Ok(())
    }

    /// Ask the server to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let uptime = state.started.elapsed().as_secs();
    state.collector.set_uptime(uptime as i64);

    Json(json!({
        "status": "healthy",
        "service": state.service_name,
        "uptime_seconds": uptime,
        "version": crate::VERSION,
    }))
}

async fn metrics_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let families = state.collector.registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&families, &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer).into_response(),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response()
        }
    }
}
