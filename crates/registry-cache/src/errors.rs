use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry fetch failed: {0}")]
    Fetch(String),
    #[error("registry returned no {0}")]
    Empty(&'static str),
    #[error("no contact with the registry at startup and no local copy to fall back on")]
    NotInitialized,
}

/// Failures reading or writing the local copy of the registry data.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt local copy {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("failed to encode local copy: {0}")]
    Encode(String),
}
