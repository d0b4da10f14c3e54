// ABOUTME: Error types for the karaoke song service
// ABOUTME: Maps library and storage failures onto HTTP status codes and JSON bodies

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KaraokeError>;

#[derive(Debug, Error)]
pub enum KaraokeError {
    /// The `key` query parameter was absent or empty
    #[error("Song key is missing.")]
    MissingKey,

    /// The key does not name a song of the configured library
    #[error("Invalid song key: {0}")]
    InvalidKey(String),

    /// A selection that is not part of the most recent listing
    #[error("Please select a valid song from the list: {0}")]
    UnknownSong(String),

    /// Endpoint does not match the configured song layout
    #[error("{0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KaraokeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            KaraokeError::MissingKey
            | KaraokeError::InvalidKey(_)
            | KaraokeError::UnknownSong(_)
            | KaraokeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            KaraokeError::Storage(_) | KaraokeError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message exposed to HTTP clients. Storage details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            KaraokeError::Storage(_) => "Error talking to the song storage.".to_string(),
            KaraokeError::Config(_) => "Server is misconfigured.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for KaraokeError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message() });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(KaraokeError::MissingKey.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            KaraokeError::InvalidKey("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            KaraokeError::Storage("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_message_hides_details() {
        let err = KaraokeError::Storage("AccessDenied for secret-bucket".into());
        assert!(!err.message().contains("secret-bucket"));
        assert_eq!(KaraokeError::MissingKey.message(), "Song key is missing.");
    }
}
