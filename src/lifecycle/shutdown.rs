//! Fatal-error shutdown trigger.
//!
//! Subsystems that hit an unrecoverable error after start (e.g. the server's
//! accept loop dying) report it through a [`FatalErrorReporter`]. A single
//! listener task forwards the first report to [`Root::shutdown`], which
//! passes it on verbatim to `on_shutdown`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::BoxError;
use crate::lifecycle::root::Root;
use crate::lifecycle::service::{ConfigService, LoggingService, Server};

/// Cloneable handle for reporting fatal errors.
#[derive(Debug, Clone)]
pub struct FatalErrorReporter {
    tx: mpsc::UnboundedSender<BoxError>,
}

impl FatalErrorReporter {
    /// Report a fatal error. Returns `false` if nobody is listening anymore.
    pub fn report(&self, err: impl Into<BoxError>) -> bool {
        let err = err.into();
        warn!(error = %err, "Fatal error reported");
        self.tx.send(err).is_ok()
    }

    /// True once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving end of the fatal-error channel.
#[derive(Debug)]
pub struct FatalErrors {
    rx: mpsc::UnboundedReceiver<BoxError>,
}

impl FatalErrors {
    /// Next reported error; `None` once every reporter is dropped.
    pub async fn recv(&mut self) -> Option<BoxError> {
        self.rx.recv().await
    }
}

/// Create a connected reporter/receiver pair.
pub fn fatal_channel() -> (FatalErrorReporter, FatalErrors) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FatalErrorReporter { tx }, FatalErrors { rx })
}

/// Forward the first fatal error to `root.shutdown(Some(err))`.
///
/// Later reports are ignored: shutdown is single-shot.
pub fn spawn_fatal_listener<C, L, S>(
    root: Arc<Root<C, L, S>>,
    mut errors: FatalErrors,
) -> JoinHandle<()>
where
    C: ConfigService + 'static,
    L: LoggingService + 'static,
    S: Server + 'static,
{
    tokio::spawn(async move {
        match errors.recv().await {
            Some(err) => {
                if let Err(e) = root.shutdown(Some(err)).await {
                    error!(error = %e, "Shutdown after fatal error was not clean");
                }
            }
            None => debug!("All fatal error reporters dropped"),
        }
    })
}
