use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::upload::RecordingKind;

/// Lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session
    Idle,
    /// Session active, waiting for the next turn (reply playing)
    Waiting,
    /// A turn is being recorded
    Recording,
    /// Turn sent, waiting for the reply
    Processing,
    /// Teardown in progress
    Ending,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Waiting | SessionState::Recording | SessionState::Processing
        )
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// The live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub active: bool,
    pub remaining_seconds: u64,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(remaining_seconds: u64) -> Self {
        Self {
            id: format!("interview-{}", uuid::Uuid::new_v4()),
            active: true,
            remaining_seconds,
            started_at: Utc::now(),
        }
    }
}

/// Notifications published by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Status(String),
    /// Countdown tick, with the seconds left afterwards
    Tick { remaining: u64 },
    /// Reply text to display
    Response(String),
    TurnSent { bytes: usize },
    Uploaded { kind: RecordingKind },
    UploadFailed { kind: RecordingKind, error: String },
    Ended,
}
