use thiserror::Error;

/// Failures of the model stream transport. Any of them ends the turn.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The stream could not be opened; no delta was produced.
    #[error("failed to open model stream: {0}")]
    Open(String),

    /// The provider refused the request, e.g. overload or bad credentials.
    #[error("model request rejected: {0}")]
    Rejected(String),

    /// The connection broke after streaming had started.
    #[error("model stream interrupted: {0}")]
    Interrupted(String),

    /// A frame arrived that could not be decoded into a delta.
    #[error("undecodable stream frame: {0}")]
    Decode(String),
}

impl ModelError {
    /// Whether the failure happened before any delta was streamed.
    pub fn before_first_delta(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_rejected_precede_streaming() {
        assert!(ModelError::Open("dns".into()).before_first_delta());
        assert!(ModelError::Rejected("429".into()).before_first_delta());
        assert!(!ModelError::Interrupted("reset".into()).before_first_delta());
        assert!(!ModelError::Decode("bad utf-8".into()).before_first_delta());
    }
}
