//! Lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Created → Starting → Running
//!              │          │
//!              └────┬─────┘
//! Created ──────────┼──────→ ShuttingDown → Stopped
//! ```
//!
//! Transitions are compare-and-swap on a single atomic, so concurrent
//! shutdown triggers race on one word and exactly one of them wins.

use std::sync::atomic::{AtomicU8, Ordering};

/// Current phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Starting = 1,
    Running = 2,
    ShuttingDown = 3,
    Stopped = 4,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Created,
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Stopped,
        }
    }

    /// True once teardown has begun.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::ShuttingDown | LifecycleState::Stopped)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Created => write!(f, "created"),
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::ShuttingDown => write!(f, "shutting down"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Atomic cell holding a [`LifecycleState`].
#[derive(Debug)]
pub struct AtomicLifecycle(AtomicU8);

impl AtomicLifecycle {
    pub fn new(state: LifecycleState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`. On failure returns the state actually observed.
    pub fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }

    /// Claim the shutdown transition.
    ///
    /// Succeeds for exactly one caller; returns the state it left. Everyone
    /// else gets `None`.
    pub fn begin_shutdown(&self) -> Option<LifecycleState> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if LifecycleState::from_u8(current).is_terminal() {
                return None;
            }
            match self.0.compare_exchange_weak(
                current,
                LifecycleState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(LifecycleState::from_u8(current)),
                Err(observed) => current = observed,
            }
        }
    }

    /// Unconditionally store `state`.
    pub fn store(&self, state: LifecycleState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
