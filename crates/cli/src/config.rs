// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI configuration.
//!
//! Configuration is read from a TOML file, by default
//! `<config dir>/barsync/config.toml`. Every field has a default, so an
//! empty or missing default file is valid:
//! - `state_dir`: where the durable queue lives
//! - `[store]`: persistence backend (`sqlite` or `file`)
//! - `[network]`: probe URL and monitor timings
//! - `[retry]`: retry budget and backoff curve
//! - `[remote]`: remote authority URL and credentials
//! - `[sync]`: periodic drain interval

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bs_core::RetryConfig;
use bs_sync::{MonitorConfig, OrchestratorConfig};
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "barsync";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the durable queue. Relative paths resolve against
    /// the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Probed with `HEAD`. Defaults to the remote's REST root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Overridden by `BARSYNC_TOKEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_interval_ms")]
    pub interval_ms: u64,
}

fn default_check_interval_ms() -> u64 {
    3_000
}

fn default_probe_timeout_ms() -> u64 {
    7_000
}

fn default_grace_period_ms() -> u64 {
    12_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_remote_url() -> String {
    "http://127.0.0.1:54321".to_string()
}

fn default_call_timeout_ms() -> u64 {
    15_000
}

fn default_sync_interval_ms() -> u64 {
    30_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            probe_url: None,
            check_interval_ms: default_check_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            grace_period_ms: default_grace_period_ms(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: default_remote_url(),
            api_key: None,
            access_token: None,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig { interval_ms: default_sync_interval_ms() }
    }
}

impl Config {
    /// Parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse config {}: {}", path.display(), e))
        })?;
        if let Some(dir) = config.state_dir.take() {
            config.state_dir = Some(match path.parent() {
                Some(base) if dir.is_relative() => base.join(dir),
                _ => dir,
            });
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration for this invocation.
    ///
    /// An explicit path (flag, then `BARSYNC_CONFIG`) must exist; the
    /// default location falls back to defaults when absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit.map(Path::to_path_buf).or_else(env::config_path) {
            return Config::load(&path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Config::load(&path),
            _ => Ok(Config::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.retry.backoff_factor < 1.0 {
            return Err(Error::Config(format!(
                "retry.backoff_factor must be at least 1.0, got {}",
                self.retry.backoff_factor
            )));
        }
        if self.network.check_interval_ms == 0 || self.sync.interval_ms == 0 {
            return Err(Error::Config("intervals must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// State directory: `BARSYNC_STATE_DIR`, then `state_dir`, then the
    /// platform data directory.
    pub fn state_dir(&self) -> Result<PathBuf> {
        env::state_dir()
            .or_else(|| self.state_dir.clone())
            .or_else(|| dirs::data_local_dir().map(|d| d.join(APP_DIR_NAME)))
            .ok_or(Error::StateDirUnavailable)
    }

    pub fn probe_url(&self) -> String {
        match &self.network.probe_url {
            Some(url) => url.clone(),
            None => format!("{}/rest/v1/", self.remote.url.trim_end_matches('/')),
        }
    }

    /// `BARSYNC_TOKEN` wins over the configured token.
    pub fn access_token(&self) -> Option<String> {
        env::token().or_else(|| self.remote.access_token.clone())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            check_interval: Duration::from_millis(self.network.check_interval_ms),
            probe_timeout: Duration::from_millis(self.network.probe_timeout_ms),
            grace_period: Duration::from_millis(self.network.grace_period_ms),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            backoff_factor: self.retry.backoff_factor,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            call_timeout: Duration::from_millis(self.remote.call_timeout_ms),
            sync_interval: Duration::from_millis(self.sync.interval_ms),
        }
    }
}

/// `<config dir>/barsync/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
