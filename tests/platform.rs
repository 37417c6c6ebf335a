//! End-to-end lifecycle with the real config, logging and HTTP services.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::{layer::SubscriberExt, reload, EnvFilter};

use platform_root::env::CONFIG_OPTION;
use platform_root::error::Subsystem;
use platform_root::lifecycle::fatal_channel;
use platform_root::observability::BOOTSTRAP_FILTER;
use platform_root::{
    BoxError, Env, FileConfigService, HttpServer, LifecycleState, PlatformRoot, Root,
    TracingLogging,
};

struct Platform {
    root: PlatformRoot,
    reasons: Arc<Mutex<Vec<Option<String>>>>,
    _subscriber: Box<dyn tracing::Subscriber + Send + Sync>,
}

fn platform(dir: &Path) -> Platform {
    let env = Arc::new(Env::new(dir, [(CONFIG_OPTION, "platform.toml")]));

    let (layer, handle) = reload::Layer::new(EnvFilter::new(BOOTSTRAP_FILTER));
    let subscriber = tracing_subscriber::registry().with(layer);
    let logging = TracingLogging::from_parts(handle, None);

    let config = FileConfigService::from_env(&env).unwrap();
    let (fatal, _errors) = fatal_channel();
    let server = HttpServer::new(config.store(), fatal);

    let reasons = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reasons);
    let root = Root::new(config, logging, server, env, move |reason: Option<BoxError>| {
        sink.lock().unwrap().push(reason.map(|e| e.to_string()));
    });

    Platform {
        root,
        reasons,
        _subscriber: Box::new(subscriber),
    }
}

fn write_config(dir: &Path, content: &str) {
    fs::write(dir.join("platform.toml"), content).unwrap();
}

#[tokio::test]
async fn serves_between_start_and_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        r#"
        [logging]
        level = "debug"

        [server]
        bind_address = "127.0.0.1:0"
        "#,
    );
    let platform = platform(dir.path());

    platform.root.start().await.unwrap();
    assert_eq!(platform.root.state(), LifecycleState::Running);

    // Logging picked up the configured level.
    assert_eq!(platform.root.logging().applied().unwrap().level, "debug");

    let addr = platform.root.server().local_addr().await.unwrap();
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let res = client.get(format!("http://{addr}/status")).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], "platform-root");

    let res = client.get(format!("http://{addr}/missing")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    platform.root.shutdown(None).await.unwrap();

    assert_eq!(platform.root.state(), LifecycleState::Stopped);
    assert!(!platform.root.server().is_running().await);
    assert!(client.get(format!("http://{addr}/health")).send().await.is_err());
    assert_eq!(*platform.reasons.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn reload_refreshes_config_only() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "[server]\nbind_address = \"127.0.0.1:0\"");
    let platform = platform(dir.path());
    platform.root.start().await.unwrap();
    let addr = platform.root.server().local_addr().await.unwrap();

    write_config(
        dir.path(),
        "[logging]\nlevel = \"warn\"\n[server]\nbind_address = \"127.0.0.1:0\"",
    );
    platform.root.reload_config().await.unwrap();

    let store = platform.root.config().store();
    assert_eq!(store.current().logging.level, "warn");

    // No cascade: logging keeps what it was given at start, server keeps its socket.
    assert_eq!(platform.root.logging().applied().unwrap().level, "info");
    assert_eq!(platform.root.server().local_addr().await, Some(addr));

    platform.root.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn invalid_config_fails_before_server_starts() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "[server]\nrequest_timeout_secs = 0");
    let platform = platform(dir.path());

    let err = platform.root.start().await.unwrap_err();

    assert_eq!(err.subsystem(), Some(Subsystem::Config));
    assert!(err.to_string().contains("request_timeout_secs"));
    assert!(!platform.root.server().is_running().await);

    platform.root.shutdown(Some(err.into())).await.unwrap();
    let reasons = platform.reasons.lock().unwrap();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].as_deref().unwrap().contains("config failed to start"));
}

#[tokio::test]
async fn mistyped_logging_section_is_rejected_by_config() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "[logging]\nlevel = [1, 2]");
    let platform = platform(dir.path());

    // The config service rejects the document first.
    let err = platform.root.start().await.unwrap_err();
    assert_eq!(err.subsystem(), Some(Subsystem::Config));
}
