//! Shared test doubles for lifecycle tests.
//!
//! Every mock writes into one ordered [`Journal`], so tests can assert both
//! call counts and cross-subsystem ordering.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use platform_root::env::Env;
use platform_root::lifecycle::{
    ConfigFragment, ConfigReader, Reloadable, Root, Startable, Stoppable, Upgradable,
};
use platform_root::BoxError;

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConfigStart,
    ConfigStop,
    ConfigReload,
    AtPath(String),
    LoggingUpgrade(ConfigFragment),
    LoggingStop,
    ServerStart,
    ServerStop,
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn contains(&self, call: &Call) -> bool {
        self.count(call) > 0
    }
}

/// Error type the tests can downcast to and compare by identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("boom #{0}")]
pub struct Boom(pub u32);

/// Which collaborator operations should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub config_start: bool,
    pub config_stop: bool,
    pub config_reload: bool,
    pub logging_upgrade: bool,
    pub logging_stop: bool,
    pub server_start: bool,
    pub server_stop: bool,
}

fn outcome(fail: bool, id: u32) -> Result<(), BoxError> {
    if fail {
        Err(Box::new(Boom(id)))
    } else {
        Ok(())
    }
}

pub struct MockConfig {
    journal: Journal,
    fragment: ConfigFragment,
    failures: Failures,
    start_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Startable for MockConfig {
    async fn start(&self) -> Result<(), BoxError> {
        self.journal.push(Call::ConfigStart);
        if let Some(gate) = &self.start_gate {
            gate.notified().await;
        }
        outcome(self.failures.config_start, 1)
    }
}

#[async_trait]
impl Stoppable for MockConfig {
    async fn stop(&self) -> Result<(), BoxError> {
        self.journal.push(Call::ConfigStop);
        outcome(self.failures.config_stop, 2)
    }
}

#[async_trait]
impl Reloadable for MockConfig {
    async fn reload_config(&self) -> Result<(), BoxError> {
        self.journal.push(Call::ConfigReload);
        outcome(self.failures.config_reload, 3)
    }
}

impl ConfigReader for MockConfig {
    fn at_path(&self, path: &str) -> ConfigFragment {
        self.journal.push(Call::AtPath(path.to_string()));
        self.fragment.clone()
    }
}

pub struct MockLogging {
    journal: Journal,
    failures: Failures,
}

#[async_trait]
impl Upgradable for MockLogging {
    async fn upgrade(&self, config: &ConfigFragment) -> Result<(), BoxError> {
        self.journal.push(Call::LoggingUpgrade(config.clone()));
        outcome(self.failures.logging_upgrade, 4)
    }
}

#[async_trait]
impl Stoppable for MockLogging {
    async fn stop(&self) -> Result<(), BoxError> {
        self.journal.push(Call::LoggingStop);
        outcome(self.failures.logging_stop, 5)
    }
}

pub struct MockServer {
    journal: Journal,
    failures: Failures,
    stop_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Startable for MockServer {
    async fn start(&self) -> Result<(), BoxError> {
        self.journal.push(Call::ServerStart);
        outcome(self.failures.server_start, 6)
    }
}

#[async_trait]
impl Stoppable for MockServer {
    async fn stop(&self) -> Result<(), BoxError> {
        self.journal.push(Call::ServerStop);
        if let Some(gate) = &self.stop_gate {
            gate.notified().await;
        }
        outcome(self.failures.server_stop, 7)
    }
}

/// Records every `on_shutdown` invocation.
#[derive(Clone, Default)]
pub struct ShutdownLog(Arc<Mutex<Vec<Option<BoxError>>>>);

impl ShutdownLog {
    pub fn handler(&self) -> impl FnOnce(Option<BoxError>) + Send + 'static {
        let log = self.clone();
        move |reason| log.0.lock().unwrap().push(reason)
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// `Some(None)` for a graceful shutdown, `Some(Some(boom))` for a reason.
    pub fn last_reason(&self) -> Option<Option<Boom>> {
        self.0.lock().unwrap().last().map(|reason| {
            reason
                .as_ref()
                .map(|e| e.downcast_ref::<Boom>().cloned().expect("reason is a Boom"))
        })
    }
}

pub type MockRoot = Root<MockConfig, MockLogging, MockServer>;

/// Builder for a Root wired with mocks.
#[derive(Default)]
pub struct Harness {
    pub journal: Journal,
    pub shutdowns: ShutdownLog,
    pub failures: Failures,
    pub fragment: Option<ConfigFragment>,
    pub config_start_gate: Option<Arc<Notify>>,
    pub server_stop_gate: Option<Arc<Notify>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fragment the mock config service returns from `at_path`.
    pub fn logging_fragment(&self) -> ConfigFragment {
        self.fragment.clone().unwrap_or_else(|| {
            let table: toml::Table = "level = \"debug\"".parse().unwrap();
            ConfigFragment::from(table)
        })
    }

    pub fn build(&self) -> MockRoot {
        let config = MockConfig {
            journal: self.journal.clone(),
            fragment: self.logging_fragment(),
            failures: self.failures,
            start_gate: self.config_start_gate.clone(),
        };
        let logging = MockLogging {
            journal: self.journal.clone(),
            failures: self.failures,
        };
        let server = MockServer {
            journal: self.journal.clone(),
            failures: self.failures,
            stop_gate: self.server_stop_gate.clone(),
        };
        let env = Arc::new(Env::new(".", Vec::<(String, String)>::new()));
        Root::new(config, logging, server, env, self.shutdowns.handler())
    }
}
