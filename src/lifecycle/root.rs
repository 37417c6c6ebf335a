//! Root: owns the config, logging and server subsystems and drives their
//! lifecycle.
//!
//! ```text
//! start():     config.start → config.at_path("logging") → logging.upgrade → server.start
//! shutdown():  server.stop → logging.stop → config.stop → on_shutdown(reason)
//! reload():    config.reload_config
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::env::Env;
use crate::error::{BoxError, RootError, StopFailure, Subsystem};
use crate::lifecycle::service::{ConfigService, LoggingService, Server};
use crate::lifecycle::state::{AtomicLifecycle, LifecycleState};

/// Config path handed to the logging service on start.
pub const LOGGING_CONFIG_PATH: &str = "logging";

/// Called once when the lifecycle ends, with the reason (if any).
pub type ShutdownHandler = Box<dyn FnOnce(Option<BoxError>) + Send + 'static>;

/// The process lifecycle orchestrator.
///
/// Construct once at process entry and share via `Arc`; every trigger
/// (explicit call, fatal error, OS signal) goes through the same
/// [`Root::shutdown`].
pub struct Root<C, L, S> {
    config: C,
    logging: L,
    server: S,
    env: Arc<Env>,
    on_shutdown: Mutex<Option<ShutdownHandler>>,
    state: AtomicLifecycle,
    /// Serializes the start and stop sequences against each other.
    transition: tokio::sync::Mutex<()>,
}

impl<C, L, S> Root<C, L, S>
where
    C: ConfigService,
    L: LoggingService,
    S: Server,
{
    pub fn new<F>(config: C, logging: L, server: S, env: Arc<Env>, on_shutdown: F) -> Self
    where
        F: FnOnce(Option<BoxError>) + Send + 'static,
    {
        Self {
            config,
            logging,
            server,
            env,
            on_shutdown: Mutex::new(Some(Box::new(on_shutdown))),
            state: AtomicLifecycle::new(LifecycleState::Created),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Bring up config, logging and server, in that order.
    ///
    /// A failed step aborts the rest and leaves the state at `Starting`; the
    /// caller decides whether to call [`Root::shutdown`] to unwind.
    pub async fn start(&self) -> Result<(), RootError> {
        self.state
            .transition(LifecycleState::Created, LifecycleState::Starting)
            .map_err(|state| RootError::InvalidLifecycleState { operation: "start", state })?;

        let _guard = self.transition.lock().await;
        self.ensure_starting()?;

        info!(
            work_dir = %self.env.work_dir().display(),
            "Root starting"
        );

        self.start_step(Subsystem::Config, self.config.start()).await?;
        self.ensure_starting()?;

        let fragment = self.config.at_path(LOGGING_CONFIG_PATH);
        debug!(path = LOGGING_CONFIG_PATH, empty = fragment.is_empty(), "Logging config fetched");

        self.start_step(Subsystem::Logging, self.logging.upgrade(&fragment)).await?;
        self.ensure_starting()?;

        self.start_step(Subsystem::Server, self.server.start()).await?;

        self.state
            .transition(LifecycleState::Starting, LifecycleState::Running)
            .map_err(|_| RootError::Interrupted)?;

        info!("Root running");
        Ok(())
    }

    /// Refresh the configuration snapshot. Does not touch logging or server.
    ///
    /// Rejected once shutdown has begun, since the config service may
    /// already be stopped.
    pub async fn reload_config(&self) -> Result<(), RootError> {
        let state = self.state.load();
        if state.is_terminal() {
            return Err(RootError::InvalidLifecycleState { operation: "reload config", state });
        }

        debug!(%state, "Reloading config");
        self.config.reload_config().await.map_err(RootError::Reload)
    }

    /// Stop everything in reverse start order and notify `on_shutdown`.
    ///
    /// Only the first call does anything; later or concurrent calls return
    /// `Ok(())` immediately. Every stop is attempted even when an earlier
    /// one fails, and all failures are returned together.
    pub async fn shutdown(&self, reason: Option<BoxError>) -> Result<(), RootError> {
        let Some(previous) = self.state.begin_shutdown() else {
            debug!("Shutdown already in progress");
            return Ok(());
        };

        match &reason {
            Some(err) => error!(error = %err, from = %previous, "Root shutting down"),
            None => info!(from = %previous, "Root shutting down"),
        }

        let _guard = self.transition.lock().await;
        let mut failures = Vec::new();

        if previous == LifecycleState::Created {
            debug!("Nothing was started, skipping subsystem stops");
        } else {
            self.stop_step(Subsystem::Server, self.server.stop(), &mut failures).await;
            self.stop_step(Subsystem::Logging, self.logging.stop(), &mut failures).await;
            self.stop_step(Subsystem::Config, self.config.stop(), &mut failures).await;
        }

        self.state.store(LifecycleState::Stopped);
        info!(failures = failures.len(), "Root stopped");

        let handler = self
            .on_shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handler) = handler {
            handler(reason);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RootError::Shutdown(failures))
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn logging(&self) -> &L {
        &self.logging
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    fn ensure_starting(&self) -> Result<(), RootError> {
        match self.state.load() {
            LifecycleState::Starting => Ok(()),
            state => {
                warn!(%state, "Startup interrupted");
                Err(RootError::Interrupted)
            }
        }
    }

    async fn start_step<F>(&self, subsystem: Subsystem, step: F) -> Result<(), RootError>
    where
        F: Future<Output = Result<(), BoxError>>,
    {
        debug!(%subsystem, "Starting subsystem");
        step.await.map_err(|source| {
            error!(%subsystem, error = %source, "Subsystem failed to start");
            RootError::Startup { subsystem, source }
        })
    }

    async fn stop_step<F>(&self, subsystem: Subsystem, step: F, failures: &mut Vec<StopFailure>)
    where
        F: Future<Output = Result<(), BoxError>>,
    {
        debug!(%subsystem, "Stopping subsystem");
        if let Err(source) = step.await {
            error!(%subsystem, error = %source, "Subsystem failed to stop");
            failures.push(StopFailure { subsystem, source });
        }
    }
}
