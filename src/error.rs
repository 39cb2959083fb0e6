use thiserror::Error;

/// Errors surfaced by the session controller and its collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Capture device denied, missing, or failed to record
    #[error("Failed to access media devices: {0}")]
    Device(String),

    /// Channel handshake timed out or the channel closed underneath us
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server message could not be parsed or decoded
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// Recording submission failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Reply audio could not be played
    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("A session is already active")]
    AlreadyActive,
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Upload(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SessionError::Connection(err.to_string())
    }
}
