//! Engine configuration: TOML file plus environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::recognition::Grammar;

pub const ENV_SCRIPT_TIMEOUT_MS: &str = "RSPROBE_SCRIPT_TIMEOUT_MS";
pub const ENV_PAGE_SETTLE_MS: &str = "RSPROBE_PAGE_SETTLE_MS";
pub const ENV_EVENT_POLL_MS: &str = "RSPROBE_EVENT_POLL_MS";
pub const ENV_BYPASS_FRAME_RESET: &str = "RSPROBE_BYPASS_FRAME_RESET";
pub const ENV_WEBDRIVER_URL: &str = "RSPROBE_WEBDRIVER_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Separator tokens of the recognition-string syntax
    pub grammar: Grammar,
    /// Deadline for injected scripts
    pub script_timeout_ms: u64,
    /// Interval of the shared event poller
    pub event_poll_interval_ms: u64,
    /// Wait before comparing URLs during stale frame recovery
    pub page_settle_ms: u64,
    pub bypass_frame_reset: bool,
    /// Extra toolkit class name to component type mappings
    pub class_types: HashMap<String, String>,
    pub webdriver_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            grammar: Grammar::default(),
            script_timeout_ms: 10_000,
            event_poll_interval_ms: 500,
            page_settle_ms: 2_000,
            bypass_frame_reset: false,
            class_types: HashMap::new(),
            webdriver_url: None,
        }
    }
}

impl EngineConfig {
    /// `~/.rsprobe/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Unable to determine home directory")?;
        Ok(home_dir.join(".rsprobe").join("config.toml"))
    }

    /// Load from `path`, or the default path when `None`. A missing default
    /// file yields the defaults; a missing explicit file is an error.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Ok(default) if default.exists() => Self::from_file(&default)?,
                Ok(_) => EngineConfig::default(),
                Err(e) => {
                    debug!("No default config location: {}", e);
                    EngineConfig::default()
                }
            },
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override fields from `RSPROBE_*` variables. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env(&mut self) {
        if let Some(ms) = env_number(ENV_SCRIPT_TIMEOUT_MS) {
            self.script_timeout_ms = ms;
        }
        if let Some(ms) = env_number(ENV_PAGE_SETTLE_MS) {
            self.page_settle_ms = ms;
        }
        if let Some(ms) = env_number(ENV_EVENT_POLL_MS) {
            self.event_poll_interval_ms = ms;
        }
        if let Ok(value) = std::env::var(ENV_BYPASS_FRAME_RESET) {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.bypass_frame_reset = true,
                "0" | "false" | "no" | "off" => self.bypass_frame_reset = false,
                other => warn!("Ignoring {}={}", ENV_BYPASS_FRAME_RESET, other),
            }
        }
        if let Ok(url) = std::env::var(ENV_WEBDRIVER_URL) {
            if !url.trim().is_empty() {
                self.webdriver_url = Some(url.trim().to_string());
            }
        }
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }
}

fn env_number(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring {}={}, expected milliseconds", name, value);
            None
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
