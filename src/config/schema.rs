//! Configuration schema definitions.
//!
//! Every section derives Serde traits and has defaults, so an empty file is
//! a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration document.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings, handed to the logging service on start.
    pub logging: LoggingConfig,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Config reload behaviour.
    pub reload: ReloadConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error, off).
    pub level: String,

    /// Extra `EnvFilter` directives, e.g. `"tower_http=debug"`.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Render as an `EnvFilter` directive string.
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5601").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long `stop()` waits for in-flight requests to drain.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5601".to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ReloadConfig {
    /// Watch the config file and reload on change.
    pub watch: bool,
}
