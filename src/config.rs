// src/config.rs

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ct_log::{COMPAT_VERSION, LogState};

/// Environment variable overriding the data directory holding log lists
pub const DATA_DIR_ENV: &str = "CT_LOGSTORE_DATA";

#[derive(Debug, Deserialize, Clone)]
pub struct LogStoreConfig {
    #[serde(default = "default_log_list_path")]
    pub log_list_path: PathBuf,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default)]
    pub trust_loaded_without_policy: bool,
    #[serde(default)]
    pub watch: bool,  // Expire the staleness gate on file change
}

fn default_data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/var/lib/ct-logstore"))
}

/// `<data dir>/ct/v1/current/log_list.json`
pub fn default_log_list_path() -> PathBuf {
    default_data_dir()
        .join("ct")
        .join(format!("v{}", COMPAT_VERSION))
        .join("current")
        .join("log_list.json")
}

fn default_check_interval() -> u64 { 10 * 60 }

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            log_list_path: default_log_list_path(),
            check_interval_secs: default_check_interval(),
            trust_loaded_without_policy: false,
            watch: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_logs")]
    pub min_logs: usize,
    #[serde(default = "default_min_operators")]
    pub min_operators: usize,
    #[serde(default = "default_accepted_states")]
    pub accepted_states: Vec<LogState>,
}

fn default_policy_enabled() -> bool { true }
fn default_min_logs() -> usize { 2 }
fn default_min_operators() -> usize { 2 }
fn default_accepted_states() -> Vec<LogState> {
    vec![LogState::Usable, LogState::Qualified]
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: default_policy_enabled(),
            min_logs: default_min_logs(),
            min_operators: default_min_operators(),
            accepted_states: default_accepted_states(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub log_store: LogStoreConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: Config = toml::from_str(contents).context("Failed to parse config")?;
        Ok(cfg)
    }
}
