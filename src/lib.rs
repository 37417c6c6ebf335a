//! Platform root: process lifecycle orchestrator.
//!
//! A single [`Root`] owns the configuration, logging and HTTP server
//! subsystems and starts, reloads and stops them in a fixed order.

pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::FileConfigService;
pub use env::Env;
pub use error::{BoxError, RootError, Subsystem};
pub use http::HttpServer;
pub use lifecycle::{LifecycleState, Root};
pub use observability::TracingLogging;

/// Root wired with the production collaborators.
pub type PlatformRoot = Root<FileConfigService, TracingLogging, HttpServer>;
