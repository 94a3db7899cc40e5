//! Executor configuration that can come from a config file or the
//! environment.
//!
//! # Design
//! `BridgeConfig` deserializes with serde defaults, so a partial document is
//! valid. `from_env` layers `RPC_BRIDGE_*` variables over those defaults;
//! an unparsable value is an error, never silently ignored. The executor
//! consumes a config through `ExecutorBuilder::from_config`.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::ExponentialBackoff;
use crate::user_agent::UserAgentEntry;

pub const ENV_BASE_URL: &str = "RPC_BRIDGE_BASE_URL";
pub const ENV_MAX_ATTEMPTS: &str = "RPC_BRIDGE_MAX_ATTEMPTS";
pub const ENV_BACKOFF_SLOT_MS: &str = "RPC_BRIDGE_BACKOFF_SLOT_MS";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidVar { name: &'static str, value: String },
}

/// Retry budget for 429 and 503 responses. `max_attempts` counts the first
/// attempt, so `1` disables retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_slot_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_slot_ms: 250,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.max_attempts, Duration::from_millis(self.backoff_slot_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: Option<String>,
    pub retry: RetryConfig,
    /// Caller user agents, most specific first.
    pub user_agents: Vec<UserAgentEntry>,
}

impl BridgeConfig {
    /// Read `RPC_BRIDGE_*` variables; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`BridgeConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            base_url: lookup(ENV_BASE_URL),
            ..Self::default()
        };
        if let Some(max_attempts) = parse_var(&lookup, ENV_MAX_ATTEMPTS)? {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(slot) = parse_var(&lookup, ENV_BACKOFF_SLOT_MS)? {
            config.retry.backoff_slot_ms = slot;
        }
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
    }
}
