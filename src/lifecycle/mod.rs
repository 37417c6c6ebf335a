//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (root.rs):
//!     Config start → read logging fragment → Logging upgrade → Server start
//!
//! Shutdown (root.rs):
//!     Server stop → Logging stop → Config stop → on_shutdown(reason)
//!
//! Triggers:
//!     explicit call            → Root::shutdown(None | Some(err))
//!     fatal error (shutdown.rs) → Root::shutdown(Some(err))
//!     SIGTERM/SIGINT (signals.rs) → Root::shutdown(None)
//!     SIGHUP (signals.rs)      → Root::reload_config()
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then the server
//! - Ordered shutdown is the exact reverse; every stop is attempted
//! - Shutdown is single-shot: one CAS on the lifecycle state decides the winner
//! - No timeouts here: callers wanting a deadline wrap `shutdown()` themselves

pub mod root;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use root::{Root, ShutdownHandler, LOGGING_CONFIG_PATH};
pub use service::{
    ConfigFragment, ConfigReader, ConfigService, LoggingService, Reloadable, Server, Startable,
    Stoppable, Upgradable,
};
pub use shutdown::{fatal_channel, spawn_fatal_listener, FatalErrorReporter, FatalErrors};
pub use signals::spawn_signal_listener;
pub use state::{AtomicLifecycle, LifecycleState};
