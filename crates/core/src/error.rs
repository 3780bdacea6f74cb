//! Shared error model for parsing and validating boundary values.

use thiserror::Error;

/// Failure to turn an external value (backend row, query string, env var)
/// into a typed one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("unknown portal '{0}'")]
    UnknownPortal(String),
}

impl CoreError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
