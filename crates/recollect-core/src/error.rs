//! Error types for recollect.

use thiserror::Error;

/// Result type alias using recollect's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for recollect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or insufficient input, caller's fault
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness violation, e.g. a duplicate step order
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Language-model enrichment failed or timed out
    #[error("Inference error: {0}")]
    Inference(String),

    /// Speech-to-text service failed or timed out
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("thought 42".to_string());
        assert_eq!(err.to_string(), "Not found: thought 42");
    }

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("no valid fields to update".to_string());
        assert_eq!(err.to_string(), "Validation error: no valid fields to update");
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("duplicate step order".to_string());
        assert_eq!(err.to_string(), "Conflict: duplicate step order");
    }

    #[test]
    fn test_error_display_inference() {
        let err = Error::Inference("model timeout".to_string());
        assert_eq!(err.to_string(), "Inference error: model timeout");
    }

    #[test]
    fn test_error_display_transcription() {
        let err = Error::Transcription("backend unreachable".to_string());
        assert_eq!(err.to_string(), "Transcription error: backend unreachable");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
