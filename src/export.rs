use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serves the metrics sink's registry in Prometheus text format, plus a
/// liveness endpoint at /health.
pub struct MetricsServer {
    addr: String,
    path: String,
    registry: Registry,
    state: Mutex<Option<ServerHandle>>,
}

struct ServerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

struct AppState {
    registry: Registry,
}

impl MetricsServer {
    pub fn new(addr: impl Into<String>, path: impl Into<String>, registry: Registry) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            addr: addr.into(),
            path,
            registry,
            state: Mutex::new(None),
        }
    }

    /// Binds the listener and spawns the server task. A bind failure is
    /// fatal; runtime serve errors are logged on the spawned task.
    pub async fn start(&self) -> Result<()> {
        let app = Router::new()
            .route(&self.path, get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(std::sync::Arc::new(AppState {
                registry: self.registry.clone(),
            }));

        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("listening on {}", self.addr))?;
        let local_addr = listener.local_addr().context("getting local address")?;

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let task = tokio::spawn(async move {
            info!(addr = %local_addr, "metrics server started");
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown.cancelled().await;
                })
                .await;
            if let Err(e) = result {
                error!(error = %e, "metrics server error");
            }
        });

        *self.state.lock() = Some(ServerHandle {
            cancel,
            task,
            local_addr,
        });
        Ok(())
    }

    /// Signals the server to stop and waits for the task to finish.
    pub async fn stop(&self) -> Result<()> {
        let Some(handle) = self.state.lock().take() else {
            return Ok(());
        };
        handle.cancel.cancel();
        handle.task.await.context("joining metrics server task")?;
        Ok(())
    }

    /// The address the server is actually bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().as_ref().map(|handle| handle.local_addr)
    }
}

async fn metrics_handler(State(state): State<std::sync::Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&state.registry.gather(), &mut buffer) {
        error!(error = %e, "encoding metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "encoding error".to_string(),
        );
    }
    match String::from_utf8(buffer) {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!(error = %e, "converting metrics to string");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding error".to_string(),
            )
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}
