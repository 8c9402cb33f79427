// src/config.rs

//! Manages multiplexer configuration: loading from TOML, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;
use url::Url;
use wildmatch::WildMatch;

/// Holds security-related configuration, such as which hosts may be requested.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SecurityConfig {
    /// Glob patterns (e.g. `*.example.com`) for hosts a request may target.
    /// If empty, all hosts are allowed.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

impl SecurityConfig {
    /// Parses `url` and checks its host against the allowlist.
    pub fn check_url(&self, url: &str) -> Result<Url> {
        let parsed = Url::parse(url).with_context(|| format!("invalid URL '{url}'"))?;
        if self.allowed_domains.is_empty() {
            return Ok(parsed);
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| anyhow!("URL '{url}' has no host"))?;
        if self
            .allowed_domains
            .iter()
            .any(|pattern| WildMatch::new(pattern).matches(host))
        {
            Ok(parsed)
        } else {
            Err(anyhow!("host '{host}' is not in the allowed domains list"))
        }
    }
}

/// The top-level configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Publish events from the primary thread only (see `Dispatcher`).
    #[serde(default)]
    pub dispatch_to_primary: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Keyword reported for callbacks that reference an unknown slot.
    #[serde(default = "default_keyword")]
    pub default_keyword: String,
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub security: SecurityConfig,
}

fn default_timeout_secs() -> u64 {
    180
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_keyword() -> String {
    "Default".to_string()
}
fn default_event_bus_capacity() -> usize {
    crate::core::events::DEFAULT_BUS_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            dispatch_to_primary: false,
            log_level: default_log_level(),
            default_keyword: default_keyword(),
            event_bus_capacity: default_event_bus_capacity(),
            user_agent: None,
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration to ensure settings are logical.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs cannot be 0"));
        }
        if self.default_keyword.trim().is_empty() {
            return Err(anyhow!("default_keyword cannot be empty"));
        }
        if self.event_bus_capacity == 0 {
            return Err(anyhow!("event_bus_capacity cannot be 0"));
        }
        if self.timeout_secs > 3600 {
            warn!(
                "timeout_secs is {}; requests may hold a slot for over an hour.",
                self.timeout_secs
            );
        }
        for pattern in &self.security.allowed_domains {
            if pattern.trim().is_empty() {
                return Err(anyhow!("security.allowed_domains contains an empty pattern"));
            }
        }
        Ok(())
    }
}
