//! Error types shared by the orchestrator and its collaborators.

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Type-erased error returned by collaborator operations.
///
/// Root never inspects collaborator errors; it only tags them with the
/// subsystem that produced them and passes them on.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three subsystems owned by [`Root`](crate::lifecycle::Root).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Config,
    Logging,
    Server,
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subsystem::Config => write!(f, "config"),
            Subsystem::Logging => write!(f, "logging"),
            Subsystem::Server => write!(f, "server"),
        }
    }
}

/// A single failed `stop()` collected during shutdown.
#[derive(Debug, Error)]
#[error("{subsystem} failed to stop: {source}")]
pub struct StopFailure {
    pub subsystem: Subsystem,
    #[source]
    pub source: BoxError,
}

/// Errors surfaced by [`Root`](crate::lifecycle::Root) operations.
#[derive(Debug, Error)]
pub enum RootError {
    /// Operation not permitted in the current lifecycle state.
    #[error("cannot {operation} while {state}")]
    InvalidLifecycleState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// A start step failed; later steps were not attempted.
    #[error("{subsystem} failed to start: {source}")]
    Startup {
        subsystem: Subsystem,
        #[source]
        source: BoxError,
    },

    /// Shutdown began while start was still running.
    #[error("startup interrupted by shutdown")]
    Interrupted,

    /// The configuration service rejected a reload.
    #[error("config reload failed: {0}")]
    Reload(#[source] BoxError),

    /// One or more subsystems failed to stop. Every stop was still attempted.
    #[error("{} subsystem(s) failed to stop: {}", .0.len(), join_failures(.0))]
    Shutdown(Vec<StopFailure>),
}

impl RootError {
    /// The subsystem that caused a startup failure, if any.
    pub fn subsystem(&self) -> Option<Subsystem> {
        match self {
            RootError::Startup { subsystem, .. } => Some(*subsystem),
            _ => None,
        }
    }
}

fn join_failures(failures: &[StopFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
