//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create Axum Router with the platform endpoints
//! - Wire up middleware (request ID, tracing, timeouts)
//! - Bind on `start()`, drain on `stop()`
//! - Report a dying serve loop as a fatal error

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigStore, ServerConfig};
use crate::error::BoxError;
use crate::lifecycle::{FatalErrorReporter, Startable, Stoppable};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server already started")]
    AlreadyStarted,

    #[error("serve loop failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("connections did not drain within {0:?}")]
    DrainTimeout(Duration),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub name: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

struct Running {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    drain_timeout: Duration,
}

/// HTTP server collaborator.
///
/// Reads the `server` section from the shared config store each time it
/// starts.
pub struct HttpServer {
    store: ConfigStore,
    fatal: FatalErrorReporter,
    running: Mutex<Option<Running>>,
}

impl HttpServer {
    pub fn new(store: ConfigStore, fatal: FatalErrorReporter) -> Self {
        Self {
            store,
            fatal,
            running: Mutex::new(None),
        }
    }

    /// Address actually bound, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/status", get(status))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }
}

#[async_trait]
impl Startable for HttpServer {
    async fn start(&self) -> Result<(), BoxError> {
        let mut slot = self.running.lock().await;
        if slot.is_some() {
            return Err(ServerError::AlreadyStarted.into());
        }

        let config = self.store.current().server;
        let address: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(config.bind_address.clone()))?;

        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address, source })?;

        let app = Self::build_router(&config, AppState { started_at: Instant::now() });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let fatal = self.fatal.clone();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;

            match served {
                Ok(()) => tracing::info!("HTTP server stopped"),
                Err(e) => {
                    tracing::error!(error = %e, "HTTP server failed");
                    fatal.report(ServerError::Serve(e));
                }
            }
        });

        tracing::info!(address = %local_addr, "HTTP server listening");

        *slot = Some(Running {
            local_addr,
            shutdown_tx,
            task,
            drain_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        });
        Ok(())
    }
}

#[async_trait]
impl Stoppable for HttpServer {
    async fn stop(&self) -> Result<(), BoxError> {
        let Some(mut running) = self.running.lock().await.take() else {
            return Ok(());
        };

        tracing::info!(address = %running.local_addr, "HTTP server draining");
        let _ = running.shutdown_tx.send(());

        match tokio::time::timeout(running.drain_timeout, &mut running.task).await {
            Ok(joined) => joined.map_err(|e| ServerError::Task(e).into()),
            Err(_) => {
                running.task.abort();
                Err(ServerError::DrainTimeout(running.drain_timeout).into())
            }
        }
    }
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Snapshot};
    use crate::lifecycle::fatal_channel;

    fn server_on(bind_address: &str) -> HttpServer {
        let mut config = AppConfig::default();
        config.server.bind_address = bind_address.to_string();
        let store = ConfigStore::new(Snapshot { raw: toml::Table::new(), config });
        let (reporter, _errors) = fatal_channel();
        HttpServer::new(store, reporter)
    }

    #[tokio::test]
    async fn start_binds_and_stop_releases() {
        let server = server_on("127.0.0.1:0");
        assert!(server.local_addr().await.is_none());

        server.start().await.unwrap();
        let addr = server.local_addr().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.stop().await.unwrap();
        assert!(!server.is_running().await);

        // The port is free again.
        TcpListener::bind(addr).await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let server = server_on("127.0.0.1:0");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let server = server_on("127.0.0.1:0");
        server.start().await.unwrap();
        let err = server.start().await.unwrap_err();
        assert!(err.to_string().contains("already started"));
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = server_on(&taken.local_addr().unwrap().to_string());

        let err = server.start().await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
        assert!(!server.is_running().await);
    }

    #[tokio::test]
    async fn invalid_address_is_reported() {
        let server = server_on("not-an-address");
        let err = server.start().await.unwrap_err();
        assert!(err.to_string().contains("invalid bind address"));
    }
}
