//! Common error types for stemsplit

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for stemsplit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across stemsplit crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML file exists but could not be parsed
    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
