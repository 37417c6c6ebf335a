//! platform-root entry point.
//!
//! Startup sequence:
//!   1. Parse CLI into an `Env`
//!   2. Install logging at the bootstrap level
//!   3. Read the config file and assemble config, logging and server
//!   4. Wire shutdown triggers (fatal errors, signals) to `Root`
//!   5. `Root::start()`, then wait for `on_shutdown`
//!
//! Exit code is 0 for a graceful shutdown, 1 when a reason was given.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info};

use platform_root::config::service::WATCH_OPTION;
use platform_root::env::CONFIG_OPTION;
use platform_root::lifecycle::{fatal_channel, spawn_fatal_listener, spawn_signal_listener};
use platform_root::observability::BOOTSTRAP_FILTER;
use platform_root::{BoxError, Env, FileConfigService, HttpServer, Root, TracingLogging};

#[derive(Parser)]
#[command(name = "platform-root")]
#[command(about = "Runs the platform: config, logging and HTTP server under one lifecycle")]
#[command(version)]
struct Cli {
    /// Configuration file path (relative to the working directory)
    #[arg(short, long, default_value = "config/platform.toml")]
    config: PathBuf,

    /// Working directory
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Reload the config file when it changes
    #[arg(long)]
    watch_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut options = vec![(CONFIG_OPTION.to_string(), cli.config.display().to_string())];
    if cli.watch_config {
        options.push((WATCH_OPTION.to_string(), "true".to_string()));
    }
    let env = Arc::new(Env::new(work_dir, options));

    let logging = TracingLogging::install(BOOTSTRAP_FILTER)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        work_dir = %env.work_dir().display(),
        "platform-root starting"
    );

    let config = FileConfigService::from_env(&env)?;
    let (fatal, fatal_errors) = fatal_channel();
    let server = HttpServer::new(config.store(), fatal);

    let (done_tx, done_rx) = oneshot::channel::<Option<BoxError>>();
    let root = Arc::new(Root::new(config, logging, server, Arc::clone(&env), move |reason| {
        let _ = done_tx.send(reason);
    }));

    spawn_fatal_listener(Arc::clone(&root), fatal_errors);
    spawn_signal_listener(Arc::clone(&root))?;

    if let Err(e) = root.start().await {
        error!(error = %e, "Startup failed");
        if let Err(stop_err) = root.shutdown(Some(e.into())).await {
            eprintln!("error: {stop_err}");
        }
    }

    match done_rx.await {
        Ok(None) => Ok(ExitCode::SUCCESS),
        Ok(Some(reason)) => {
            // Logging is already stopped at this point.
            eprintln!("platform-root stopped: {reason}");
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
