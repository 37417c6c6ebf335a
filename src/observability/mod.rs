//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!     → logging.rs (reloadable filter → non-blocking stdout writer)
//!
//! Root drives:
//!     upgrade(logging fragment) on start
//!     stop() (flush) on shutdown
//! ```

pub mod logging;

pub use logging::{LoggingError, TracingLogging, BOOTSTRAP_FILTER};
