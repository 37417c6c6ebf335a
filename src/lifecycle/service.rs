//! Capability traits for the collaborators Root drives.
//!
//! Root only needs a narrow slice of each subsystem, so the contract is
//! split into capabilities and the three collaborator roles are bundles of
//! them. Anything implementing the right capabilities (real services or
//! test doubles) can be plugged in.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::BoxError;

/// Something that can be brought up.
#[async_trait]
pub trait Startable: Send + Sync {
    async fn start(&self) -> Result<(), BoxError>;
}

/// Something that can be torn down. Must tolerate being called without a
/// prior successful `start()`.
#[async_trait]
pub trait Stoppable: Send + Sync {
    async fn stop(&self) -> Result<(), BoxError>;
}

/// Refreshes its in-memory configuration snapshot.
#[async_trait]
pub trait Reloadable: Send + Sync {
    async fn reload_config(&self) -> Result<(), BoxError>;
}

/// Pure read access into the current configuration tree.
pub trait ConfigReader: Send + Sync {
    /// Fragment rooted at the dotted `path` (e.g. `"logging"`).
    /// A missing path yields an empty fragment.
    fn at_path(&self, path: &str) -> ConfigFragment;
}

/// Accepts a new logging configuration while running.
#[async_trait]
pub trait Upgradable: Send + Sync {
    async fn upgrade(&self, config: &ConfigFragment) -> Result<(), BoxError>;
}

/// Configuration role: start, stop, reload, read.
pub trait ConfigService: Startable + Stoppable + Reloadable + ConfigReader {}
impl<T> ConfigService for T where T: Startable + Stoppable + Reloadable + ConfigReader {}

/// Logging role: upgrade, stop.
pub trait LoggingService: Upgradable + Stoppable {}
impl<T> LoggingService for T where T: Upgradable + Stoppable {}

/// Server role: start, stop.
pub trait Server: Startable + Stoppable {}
impl<T> Server for T where T: Startable + Stoppable {}

/// Read-only view of one configuration sub-tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFragment(toml::Value);

impl ConfigFragment {
    pub fn new(value: toml::Value) -> Self {
        Self(value)
    }

    pub fn empty() -> Self {
        Self(toml::Value::Table(toml::Table::new()))
    }

    pub fn value(&self) -> &toml::Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.0, toml::Value::Table(t) if t.is_empty())
    }

    /// Deserialize the fragment into a typed section.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, toml::de::Error> {
        self.0.clone().try_into()
    }
}

impl Default for ConfigFragment {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<toml::Table> for ConfigFragment {
    fn from(table: toml::Table) -> Self {
        Self(toml::Value::Table(table))
    }
}
