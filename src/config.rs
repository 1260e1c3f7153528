use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    AUTH_SETTLE_MS, COMPLETION_DISPLAY_MS, DEFAULT_BACKEND_URL, DEFAULT_REDIRECT_PORT,
    MAX_POLL_RETRIES, POLL_INTERVAL_MS, POLL_RETRY_DELAY_MS, REQUEST_TIMEOUT_SECS,
    SAVE_DEBOUNCE_MS,
};
use crate::flags::{Flag, builtin_flags};
use crate::session::PollTiming;

/// Environment variable that overrides `backend.base_url`
pub const BACKEND_URL_ENV: &str = "FLAGSORT_BACKEND_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Flags installed for a new user and after a disconnect
    #[serde(default = "builtin_flags")]
    pub flags: Vec<Flag>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            polling: PollingConfig::default(),
            sync: SyncConfig::default(),
            ui: UiConfig::default(),
            flags: builtin_flags(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Local port the backend redirects the browser to after login
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            redirect_port: default_redirect_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Consecutive failed status checks before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// How long the completion banner stays up
    #[serde(default = "default_completion_display_ms")]
    pub completion_display_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
            completion_display_ms: default_completion_display_ms(),
        }
    }
}

impl PollingConfig {
    pub fn timing(&self) -> PollTiming {
        PollTiming {
            interval: Duration::from_millis(self.interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retries: self.max_retries.max(1),
        }
    }

    pub fn completion_display(&self) -> Duration {
        Duration::from_millis(self.completion_display_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// Wait after a successful login before re-checking the connection
    #[serde(default = "default_auth_settle_ms")]
    pub auth_settle_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: default_save_debounce_ms(),
            auth_settle_ms: default_auth_settle_ms(),
        }
    }
}

impl SyncConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn auth_settle(&self) -> Duration {
        Duration::from_millis(self.auth_settle_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: ThemeVariant,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    #[default]
    Light,
    Dark,
}

impl ThemeVariant {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_interval_ms() -> u64 {
    POLL_INTERVAL_MS
}

fn default_retry_delay_ms() -> u64 {
    POLL_RETRY_DELAY_MS
}

fn default_max_retries() -> u32 {
    MAX_POLL_RETRIES
}

fn default_completion_display_ms() -> u64 {
    COMPLETION_DISPLAY_MS
}

fn default_save_debounce_ms() -> u64 {
    SAVE_DEBOUNCE_MS
}

fn default_auth_settle_ms() -> u64 {
    AUTH_SETTLE_MS
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("flagsort");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it doesn't exist.
    /// `FLAGSORT_BACKEND_URL` wins over the file.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        if let Ok(url) = std::env::var(BACKEND_URL_ENV)
            && !url.trim().is_empty()
        {
            tracing::debug!("Backend URL overridden by {}", BACKEND_URL_ENV);
            config.backend.base_url = url.trim().to_string();
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut ids = std::collections::HashSet::new();
        for flag in &self.flags {
            if flag.id.is_empty() || flag.name.trim().is_empty() {
                anyhow::bail!("Every [[flags]] entry needs a non-empty id and name");
            }
            if !ids.insert(flag.id.as_str()) {
                anyhow::bail!("Duplicate flag id {:?} in [[flags]]", flag.id);
            }
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn ensure_dirs() -> Result<()> {
        fs::create_dir_all(Self::config_dir()?)?;
        Ok(())
    }
}
