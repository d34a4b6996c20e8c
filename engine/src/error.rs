//! Error types for the Gokuro sync engine.

use thiserror::Error;

/// All possible errors from the sync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network unreachable or non-2xx response. Never fatal; the next
    /// trigger is the implicit retry.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid puzzle key: {0}")]
    InvalidKey(String),

    #[error("invalid grid size: {0}")]
    InvalidGridSize(String),

    /// Local store failure. Reads are normally swallowed (fail-open to
    /// the not-started state); this surfaces from writes.
    #[error("local store failure: {0}")]
    Store(String),

    #[error("host application not ready")]
    NotReady,
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::MalformedPayload(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport failure: connection refused");

        let err = SyncError::InvalidKey("2025-11-20".into());
        assert_eq!(err.to_string(), "invalid puzzle key: 2025-11-20");

        assert_eq!(SyncError::Unauthorized.to_string(), "unauthorized");
    }

    #[test]
    fn json_error_maps_to_malformed_payload() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SyncError = parse_err.into();
        assert!(matches!(err, SyncError::MalformedPayload(_)));
    }
}
