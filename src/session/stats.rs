use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Statistics about the current session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub state: SessionState,

    /// Identifier of the live session, if any
    pub session_id: Option<String>,

    pub started_at: Option<DateTime<Utc>>,

    /// Elapsed time in seconds
    pub duration_secs: f64,

    /// Seconds left on the countdown
    pub remaining_seconds: Option<u64>,

    /// Turns transmitted to the server
    pub turns_sent: usize,

    /// Replies received (including malformed ones)
    pub replies_received: usize,
}
