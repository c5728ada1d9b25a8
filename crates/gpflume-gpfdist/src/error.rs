//! Error type for the ingestion adapter

use gpflume_core::ring::PushError;

/// Error surfaced by the adapter's public operations.
#[derive(Debug)]
pub enum AdapterError {
    /// Payload was not a single textual record; nothing was buffered
    InvalidPayload(&'static str),
    /// Listener failed to come up; start() was aborted with no partial state
    Startup(std::io::Error),
    /// Push hit a buffer whose stream has already ended
    Buffer(PushError),
    /// The adapter is not running
    NotRunning,
    /// Configuration invariant violated
    Config(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPayload(kind) => write!(f, "payload is not a textual record: {kind}"),
            Self::Startup(e) => write!(f, "error starting protocol listener: {e}"),
            Self::Buffer(e) => write!(f, "push rejected: {e}"),
            Self::NotRunning => write!(f, "adapter is not running"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Startup(e) => Some(e),
            Self::Buffer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PushError> for AdapterError {
    fn from(e: PushError) -> Self {
        Self::Buffer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpflume_core::ring::Termination;

    #[test]
    fn display_invalid_payload() {
        let err = AdapterError::InvalidPayload("binary");
        assert!(format!("{err}").contains("binary"));
    }

    #[test]
    fn startup_has_source() {
        use std::error::Error;
        let err = AdapterError::Startup(std::io::Error::other("bind failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn push_error_converts() {
        let err: AdapterError = PushError(Termination::Completed).into();
        assert!(matches!(err, AdapterError::Buffer(_)));
    }
}
