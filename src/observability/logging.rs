//! Structured logging.
//!
//! # Responsibilities
//! - Install the global tracing subscriber at process start
//! - Re-apply level/directives from config without reinstalling (`upgrade`)
//! - Flush buffered output on `stop`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The filter sits behind a `reload` layer, so upgrades are a handle swap
//! - Output goes through a non-blocking writer; its guard is the flush point

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::LoggingConfig;
use crate::error::BoxError;
use crate::lifecycle::{ConfigFragment, Stoppable, Upgradable};

/// Filter used before the configuration has been read.
pub const BOOTSTRAP_FILTER: &str = "platform_root=info,tower_http=info";

/// Handle onto the reloadable filter layer.
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid logging config: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("unrecognised log level '{0}'")]
    InvalidLevel(String),

    #[error("invalid filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to swap filter: {0}")]
    Reload(#[from] reload::Error),

    #[error("failed to set subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),

    #[error("logging service already stopped")]
    Stopped,
}

/// Logging service over `tracing-subscriber`.
pub struct TracingLogging {
    handle: FilterHandle,
    guard: Mutex<Option<WorkerGuard>>,
    applied: Mutex<Option<LoggingConfig>>,
    stopped: AtomicBool,
}

impl TracingLogging {
    /// Install the global subscriber with `RUST_LOG`, or `bootstrap` when
    /// `RUST_LOG` is unset or invalid.
    pub fn install(bootstrap: &str) -> Result<Self, LoggingError> {
        let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(bootstrap))?;
        let (filter, handle) = reload::Layer::new(filter);
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(writer))
            .try_init()?;

        Ok(Self::from_parts(handle, Some(guard)))
    }

    /// Wrap an existing filter handle (and optionally the writer guard).
    pub fn from_parts(handle: FilterHandle, guard: Option<WorkerGuard>) -> Self {
        Self {
            handle,
            guard: Mutex::new(guard),
            applied: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// The filter currently in effect, rendered as directives.
    pub fn current_filter(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }

    /// The last configuration applied by `upgrade`.
    pub fn applied(&self) -> Option<LoggingConfig> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn apply(&self, fragment: &ConfigFragment) -> Result<LoggingConfig, LoggingError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(LoggingError::Stopped);
        }

        let config: LoggingConfig = fragment.deserialize()?;
        if LevelFilter::from_str(&config.level).is_err() {
            return Err(LoggingError::InvalidLevel(config.level));
        }

        let filter = EnvFilter::try_new(config.filter_directives())?;
        self.handle.reload(filter)?;
        Ok(config)
    }
}

#[async_trait]
impl Upgradable for TracingLogging {
    async fn upgrade(&self, fragment: &ConfigFragment) -> Result<(), BoxError> {
        let config = self.apply(fragment)?;
        tracing::info!(
            level = %config.level,
            directives = ?config.directives,
            "Logging upgraded"
        );
        *self.applied.lock().unwrap_or_else(PoisonError::into_inner) = Some(config);
        Ok(())
    }
}

#[async_trait]
impl Stoppable for TracingLogging {
    async fn stop(&self) -> Result<(), BoxError> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!("Logging stopping, flushing output");

        // Dropping the guard flushes the non-blocking writer.
        let guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(guard);
        Ok(())
    }
}
