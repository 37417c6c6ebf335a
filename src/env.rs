//! Process environment descriptor.
//!
//! Built once at process entry and shared by reference. Nothing mutates it
//! after construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Option key holding the configuration file path.
pub const CONFIG_OPTION: &str = "config";

/// Working directory plus the raw option bag the process was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    work_dir: PathBuf,
    options: BTreeMap<String, String>,
}

impl Env {
    /// Create an environment rooted at `work_dir`.
    pub fn new<P, I, K, V>(work_dir: P, options: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            work_dir: work_dir.into(),
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Raw option value, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Boolean flag: present with any value other than `"false"`.
    pub fn flag(&self, key: &str) -> bool {
        self.option(key).is_some_and(|v| v != "false")
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The configuration file path, resolved against the working directory.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.option(CONFIG_OPTION).map(|p| self.resolve(p))
    }

    /// Resolve `path` against the working directory unless already absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }
}
