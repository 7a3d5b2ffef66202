use std::path::PathBuf;

use thiserror::Error;

/// Problems with the optional JSON config file. Always fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Why a single dashboard view could not be computed.
///
/// Views fail independently: the dashboard lists the failed ones as skipped
/// and still renders the rest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("insufficient data: column '{0}' is absent")]
    MissingColumn(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),
}
