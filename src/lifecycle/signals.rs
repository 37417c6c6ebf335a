//! OS signal handling.
//!
//! - SIGTERM / SIGINT → `Root::shutdown(None)`
//! - SIGHUP → `Root::reload_config()`
//! - A second SIGTERM / SIGINT received by the same listener forces the
//!   process to exit. A first signal that lands while another trigger is
//!   already tearing down joins that shutdown instead.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::lifecycle::root::Root;
use crate::lifecycle::service::{ConfigService, LoggingService, Server};

/// Exit code used when a repeated termination signal forces exit.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Install signal handlers and spawn the task that routes them into `root`.
#[cfg(unix)]
pub fn spawn_signal_listener<C, L, S>(root: Arc<Root<C, L, S>>) -> std::io::Result<JoinHandle<()>>
where
    C: ConfigService + 'static,
    L: LoggingService + 'static,
    S: Server + 'static,
{
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    info!("Signal handlers installed (SIGTERM, SIGINT, SIGHUP)");

    Ok(tokio::spawn(async move {
        let mut terminating = false;
        loop {
            tokio::select! {
                Some(()) = sigterm.recv() => on_terminate(&root, "SIGTERM", &mut terminating),
                Some(()) = sigint.recv() => on_terminate(&root, "SIGINT", &mut terminating),
                Some(()) = sighup.recv() => {
                    info!("Received SIGHUP, reloading config");
                    if let Err(e) = root.reload_config().await {
                        error!(error = %e, "Config reload failed");
                    }
                }
                else => break,
            }
        }
    }))
}

/// Install the Ctrl+C handler (the only signal available off Unix).
#[cfg(not(unix))]
pub fn spawn_signal_listener<C, L, S>(root: Arc<Root<C, L, S>>) -> std::io::Result<JoinHandle<()>>
where
    C: ConfigService + 'static,
    L: LoggingService + 'static,
    S: Server + 'static,
{
    info!("Signal handlers installed (Ctrl+C)");

    Ok(tokio::spawn(async move {
        let mut terminating = false;
        while tokio::signal::ctrl_c().await.is_ok() {
            on_terminate(&root, "Ctrl+C", &mut terminating);
        }
    }))
}

/// `terminating` is owned by the listener task: only a repeat of a signal
/// this listener already acted on forces exit.
fn on_terminate<C, L, S>(root: &Arc<Root<C, L, S>>, name: &'static str, terminating: &mut bool)
where
    C: ConfigService + 'static,
    L: LoggingService + 'static,
    S: Server + 'static,
{
    if std::mem::replace(terminating, true) {
        warn!(signal = name, "Received again during shutdown, forcing exit");
        std::process::exit(FORCED_EXIT_CODE);
    }

    if root.state().is_terminal() {
        info!(signal = name, state = %root.state(), "Received, shutdown already in progress");
    } else {
        info!(signal = name, "Received, shutting down");
    }
    // Coalesces with a shutdown already in flight.
    let root = Arc::clone(root);
    tokio::spawn(async move {
        if let Err(e) = root.shutdown(None).await {
            error!(error = %e, "Shutdown after signal was not clean");
        }
    });
}
