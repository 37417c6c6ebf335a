//! Shared, atomically swappable configuration snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;

use crate::config::schema::AppConfig;
use crate::lifecycle::ConfigFragment;

/// One accepted configuration: the raw tree plus its typed view.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub raw: toml::Table,
    pub config: AppConfig,
}

/// Cheap-to-clone read handle onto the current snapshot.
///
/// Readers never block writers; a reload swaps in a whole new snapshot.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    inner: Arc<ArcSwap<Snapshot>>,
}

impl ConfigStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(snapshot)),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.load_full()
    }

    /// Typed view of the current configuration.
    pub fn current(&self) -> AppConfig {
        self.inner.load().config.clone()
    }

    pub(crate) fn publish(&self, snapshot: Snapshot) {
        self.inner.store(Arc::new(snapshot));
    }

    /// Fragment at the dotted `path`; empty if any segment is missing.
    pub fn at_path(&self, path: &str) -> ConfigFragment {
        let snapshot = self.inner.load();
        lookup(&snapshot.raw, path)
            .map(|value| ConfigFragment::new(value.clone()))
            .unwrap_or_default()
    }

    /// Deserialize the section at `path`.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<T, toml::de::Error> {
        self.at_path(path).deserialize()
    }
}

fn lookup<'a>(table: &'a toml::Table, path: &str) -> Option<&'a toml::Value> {
    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let mut value = table.get(first)?;
    for segment in segments {
        value = value.as_table()?.get(segment)?;
    }
    Some(value)
}
