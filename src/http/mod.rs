//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → /health, /status handlers
//!     → Send to client
//! ```

pub mod server;

pub use server::{HttpServer, ServerError};
