//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse into a raw table)
//!     → validation.rs (semantic checks)
//!     → store.rs (raw table + typed AppConfig, swapped atomically)
//!     → service.rs (start / stop / reload / at_path for Root)
//!
//! On reload (SIGHUP, explicit call, or watcher.rs):
//!     loader.rs loads the file again
//!     → validation.rs validates
//!     → atomic swap of the snapshot
//!     → dependents read the new snapshot on their own schedule
//! ```
//!
//! # Design Decisions
//! - A snapshot is immutable once published; changes require a full reload
//! - All fields have defaults to allow minimal configs
//! - Invalid reloads are rejected and the previous snapshot stays live

pub mod loader;
pub mod schema;
pub mod service;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{AppConfig, LoggingConfig, ReloadConfig, ServerConfig};
pub use service::FileConfigService;
pub use store::{ConfigStore, Snapshot};
