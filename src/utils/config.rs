use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use easy_config_store::ConfigStore;
use eyre::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Overrides `api.base_url` when set.
pub const API_URL_ENV: &str = "RESUME_RANKER_API_URL";

pub type Config = Arc<ConfigInner>;

pub fn config(path: PathBuf) -> Result<Config> {
    let config_store = ConfigStore::<ConfigInner>::read(path, "config".to_string())?;
    let mut inner = (*config_store).clone();
    inner.apply_env_overrides(|key| std::env::var(key).ok());

    info!("config parsing successful");
    debug!("loaded configuration:\n{}", toml::to_string_pretty(&inner)?);

    Ok(Arc::new(inner))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigInner {
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub flow: FlowConfig,
}

impl ConfigInner {
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV)
            && !url.trim().is_empty()
        {
            info!("using API base URL from {}", API_URL_ENV);
            self.api.base_url = url.trim().to_string();
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,
    /// Retries for the object-storage PUT.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Fabricate a flagged sample upload when every encoding is rejected.
    #[serde(default = "default_synthetic_fallback")]
    pub synthetic_fallback: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            accepted_types: default_accepted_types(),
            max_retries: default_max_retries(),
            synthetic_fallback: default_synthetic_fallback(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_high_score_threshold")]
    pub high_score_threshold: u8,
    #[serde(default = "default_medium_score_threshold")]
    pub medium_score_threshold: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            high_score_threshold: default_high_score_threshold(),
            medium_score_threshold: default_medium_score_threshold(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct FlowConfig {
    /// Pause after job analysis and after ranking so the upstream index can
    /// catch up.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl FlowConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_accepted_types() -> Vec<String> {
    vec!["application/pdf".to_string(), "text/plain".to_string()]
}

fn default_max_retries() -> usize {
    3
}

fn default_synthetic_fallback() -> bool {
    true
}

fn default_high_score_threshold() -> u8 {
    85
}

fn default_medium_score_threshold() -> u8 {
    70
}

fn default_settle_delay_ms() -> u64 {
    2000
}

impl Default for ConfigInner {
    fn default() -> Self {
        let cfg = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.default.toml",));

        toml::from_str(cfg).expect("bundled config.default.toml is valid")
    }
}
