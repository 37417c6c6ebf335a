//! File-backed configuration service.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use notify::RecommendedWatcher;

use crate::config::loader::{interpret, load_raw, ConfigError};
use crate::config::schema::AppConfig;
use crate::config::store::{ConfigStore, Snapshot};
use crate::config::watcher::ConfigWatcher;
use crate::env::Env;
use crate::error::BoxError;
use crate::lifecycle::{ConfigFragment, ConfigReader, Reloadable, Startable, Stoppable};

/// Env option that forces file watching on regardless of `reload.watch`.
pub const WATCH_OPTION: &str = "watch_config";

/// Configuration service backed by an optional TOML file.
///
/// Construction does no validation: the initial document is checked and
/// published by `start()`. `reload_config()` re-reads the source file and
/// swaps the snapshot only if the new document is valid.
///
/// `reload.watch` is applied by `start()` and by every explicit
/// `reload_config()`. Reloads made by the watcher itself do not toggle it.
pub struct FileConfigService {
    store: ConfigStore,
    source: Option<PathBuf>,
    initial: Mutex<Option<toml::Table>>,
    force_watch: bool,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileConfigService {
    /// Wrap an already-read document. `source` is where reloads read from.
    pub fn new(raw: toml::Table, source: Option<PathBuf>) -> Self {
        Self {
            store: ConfigStore::default(),
            source,
            initial: Mutex::new(Some(raw)),
            force_watch: false,
            watcher: Mutex::new(None),
        }
    }

    /// Read the file named by the environment's `config` option.
    ///
    /// A missing file is not an error: the service starts from defaults and
    /// picks the file up on the next reload.
    pub fn from_env(env: &Env) -> Result<Self, ConfigError> {
        let source = env.config_path();
        let raw = match &source {
            Some(path) if path.exists() => load_raw(path)?,
            Some(path) => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                toml::Table::new()
            }
            None => toml::Table::new(),
        };

        let mut service = Self::new(raw, source);
        service.force_watch = env.flag(WATCH_OPTION);
        Ok(service)
    }

    /// Read handle for dependents that need typed sections.
    pub fn store(&self) -> ConfigStore {
        self.store.clone()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// True while the file watcher is running.
    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn publish(&self, raw: toml::Table) -> Result<(), ConfigError> {
        let config = interpret(&raw)?;
        self.store.publish(Snapshot { raw, config });
        Ok(())
    }

    /// Start or stop the file watcher to match `reload.watch` (or the
    /// `watch_config` env option) in the current snapshot.
    fn sync_watcher(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if config.reload.watch || self.force_watch {
            match &self.source {
                Some(path) => self.start_watcher(path)?,
                None => tracing::warn!("Config watching requested but there is no config file"),
            }
        } else {
            self.stop_watcher();
        }
        Ok(())
    }

    fn stop_watcher(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if watcher.is_some() {
            tracing::info!("Config watcher stopped");
        }
    }

    fn start_watcher(&self, path: &Path) -> Result<(), ConfigError> {
        let mut slot = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }

        let store = self.store.clone();
        let source = path.to_path_buf();
        let watcher = ConfigWatcher::new(path).run(move || match reload_into(&store, &source) {
            Ok(()) => tracing::info!("Config reloaded from watcher"),
            Err(e) => tracing::error!(
                "Failed to reload config: {}. Keeping current configuration.",
                e
            ),
        })?;

        *slot = Some(watcher);
        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(())
    }
}

fn reload_into(store: &ConfigStore, path: &Path) -> Result<(), ConfigError> {
    let raw = load_raw(path)?;
    let config = interpret(&raw)?;
    store.publish(Snapshot { raw, config });
    Ok(())
}

#[async_trait]
impl Startable for FileConfigService {
    async fn start(&self) -> Result<(), BoxError> {
        let initial = self
            .initial
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(raw) = initial {
            self.publish(raw)?;
        }

        let config = self.store.current();
        tracing::info!(
            source = ?self.source,
            log_level = %config.logging.level,
            bind_address = %config.server.bind_address,
            "Configuration loaded"
        );

        self.sync_watcher(&config)?;
        Ok(())
    }
}

#[async_trait]
impl Stoppable for FileConfigService {
    async fn stop(&self) -> Result<(), BoxError> {
        self.stop_watcher();
        Ok(())
    }
}

#[async_trait]
impl Reloadable for FileConfigService {
    async fn reload_config(&self) -> Result<(), BoxError> {
        let path = self.source.as_deref().ok_or(ConfigError::NoSource)?;
        reload_into(&self.store, path)?;

        // A reload supersedes whatever document the service was built with.
        self.initial
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        tracing::info!(path = %path.display(), "Config reloaded");
        self.sync_watcher(&self.store.current())?;
        Ok(())
    }
}

impl ConfigReader for FileConfigService {
    fn at_path(&self, path: &str) -> ConfigFragment {
        self.store.at_path(path)
    }
}
