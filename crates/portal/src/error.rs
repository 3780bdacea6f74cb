use std::path::PathBuf;

use thiserror::Error;

use staybook_session::ConfigError;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read seed file {path}: {source}")]
    SeedRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    SeedParse(#[from] serde_json::Error),

    #[error("seed file lists {0} more than once")]
    DuplicateAccount(String),
}
