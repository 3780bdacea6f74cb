//! Process configuration: session settings plus where seed data comes from.

use std::path::PathBuf;

use staybook_session::{ConfigError, SessionConfig};

pub const ENV_SEED_FILE: &str = "STAYBOOK_SEED_FILE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalConfig {
    pub session: SessionConfig,
    /// JSON fixture for the in-memory backends; built-in demo accounts when unset.
    pub seed_file: Option<PathBuf>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let session = SessionConfig::from_lookup(&lookup)?;
        let seed_file = lookup(ENV_SEED_FILE)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
        Ok(Self { session, seed_file })
    }
}
