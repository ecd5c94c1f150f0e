// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

fn write(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn empty_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(&write(&dir, "")).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.monitor_config(), MonitorConfig::default());
    assert_eq!(config.retry_config(), RetryConfig::default());
    assert_eq!(config.orchestrator_config(), OrchestratorConfig::default());
}

#[test]
fn sections_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        r#"
state_dir = "/var/lib/barsync"

[store]
backend = "file"

[network]
probe_url = "https://status.example.com/ping"
grace_period_ms = 5000

[retry]
max_retries = 2
backoff_factor = 3.0

[remote]
url = "https://api.example.com/"
api_key = "anon"
call_timeout_ms = 2000

[sync]
interval_ms = 10000
"#,
    );

    let config = Config::load(&path).unwrap();

    assert_eq!(config.state_dir, Some(PathBuf::from("/var/lib/barsync")));
    assert_eq!(config.store.backend, StoreBackend::File);
    assert_eq!(config.probe_url(), "https://status.example.com/ping");
    assert_eq!(config.monitor_config().grace_period, Duration::from_secs(5));
    assert_eq!(config.monitor_config().check_interval, Duration::from_secs(3));
    assert_eq!(config.retry_config().max_retries, 2);
    assert_eq!(config.retry_config().initial_delay, Duration::from_secs(1));
    assert_eq!(config.orchestrator_config().call_timeout, Duration::from_secs(2));
    assert_eq!(config.orchestrator_config().sync_interval, Duration::from_secs(10));
    assert_eq!(config.remote.api_key.as_deref(), Some("anon"));
}

#[test]
fn relative_state_dir_resolves_against_config_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(&write(&dir, "state_dir = \"state\"")).unwrap();

    assert_eq!(config.state_dir, Some(dir.path().join("state")));
}

#[test]
fn probe_url_defaults_to_rest_root() {
    let mut config = Config::default();
    config.remote.url = "https://api.example.com/".to_string();

    assert_eq!(config.probe_url(), "https://api.example.com/rest/v1/");
}

#[parameterized(
    unknown_backend = { "[store]\nbackend = \"redis\"" },
    shrinking_backoff = { "[retry]\nbackoff_factor = 0.5" },
    zero_interval = { "[sync]\ninterval_ms = 0" },
    not_toml = { "state_dir = " },
)]
fn invalid_files_are_rejected(content: &str) {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&write(&dir, content)).unwrap_err();

    assert!(matches!(err, Error::Config(_)), "{:?}", err);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = Config::resolve(Some(&missing)).unwrap_err();

    assert!(err.to_string().contains("failed to read config"));
}
