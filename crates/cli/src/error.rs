//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The replay script does not exist.
    #[error("script not found at {path}")]
    ScriptNotFound { path: PathBuf },

    /// The replay script could not be parsed.
    #[error("invalid script: {0}")]
    Script(String),

    /// Arguments given to `cadence signature` are not a JSON object.
    #[error("malformed arguments for '{tool}': expected a JSON object")]
    MalformedArguments { tool: String },

    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] runtime::ConfigError),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
