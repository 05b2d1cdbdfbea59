use crate::config::ConfigError;
use crate::llm::ModelError;
use thiserror::Error;

/// Turn-level errors.
///
/// Tool failures and malformed tool calls are not errors at this level; they
/// are fed back to the model and the turn continues.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The model stream failed to open or broke mid-phase. Fatal to the turn.
    #[error("stream transport error: {0}")]
    StreamTransport(#[from] ModelError),

    /// The event consumer went away.
    #[error("event sink closed")]
    SinkClosed,

    /// The turn was cancelled by the caller.
    #[error("turn cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
