//! Session resolution settings.
//!
//! Read from the environment with defaults, the same way the binaries read
//! their other settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::navigation::DEFAULT_CONTRACT_PATH;

pub const ENV_PROFILE_TIMEOUT_MS: &str = "STAYBOOK_PROFILE_TIMEOUT_MS";
pub const ENV_CONTRACT_PATH: &str = "STAYBOOK_CONTRACT_PATH";

/// How long login flows wait for a profile before falling back.
pub const DEFAULT_PROFILE_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} must be an absolute route path, got '{value}'")]
    InvalidPath { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub profile_timeout_ms: u64,
    /// Route of the plan-contracting flow.
    pub contract_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile_timeout_ms: DEFAULT_PROFILE_TIMEOUT.as_millis() as u64,
            contract_path: DEFAULT_CONTRACT_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_PROFILE_TIMEOUT_MS) {
            config.profile_timeout_ms = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidTimeout {
                    var: ENV_PROFILE_TIMEOUT_MS,
                    value,
                })?;
        }

        if let Some(value) = lookup(ENV_CONTRACT_PATH) {
            let trimmed = value.trim();
            if !trimmed.starts_with('/') || trimmed.contains('?') {
                return Err(ConfigError::InvalidPath {
                    var: ENV_CONTRACT_PATH,
                    value,
                });
            }
            config.contract_path = trimmed.to_string();
        }

        Ok(config)
    }

    pub fn with_profile_timeout(mut self, timeout: Duration) -> Self {
        self.profile_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.profile_timeout(), DEFAULT_PROFILE_TIMEOUT);
        assert_eq!(config.contract_path, "/plans/contract");
    }

    #[test]
    fn reads_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            (ENV_PROFILE_TIMEOUT_MS, " 6000 "),
            (ENV_CONTRACT_PATH, "/contratar"),
        ]))
        .unwrap();
        assert_eq!(config.profile_timeout(), Duration::from_secs(6));
        assert_eq!(config.contract_path, "/contratar");
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = SessionConfig::from_lookup(lookup(&[(ENV_PROFILE_TIMEOUT_MS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
    }

    #[test]
    fn rejects_relative_contract_path() {
        let err = SessionConfig::from_lookup(lookup(&[(ENV_CONTRACT_PATH, "contract")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath { .. }));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "profile_timeout_ms": 250 }"#).unwrap();
        assert_eq!(config.profile_timeout(), Duration::from_millis(250));
        assert_eq!(config.contract_path, DEFAULT_CONTRACT_PATH);
    }
}
