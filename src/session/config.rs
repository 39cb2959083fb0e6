use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session length before the countdown forces the end
    /// Default: 2100 seconds (35 minutes)
    pub countdown: Duration,

    /// Countdown resolution
    pub tick: Duration,

    /// How long the channel handshake may take before start() gives up
    pub handshake_timeout: Duration,

    /// Reply text that closes the session once its audio has played
    /// (matched case-insensitively)
    pub end_marker: String,
}

impl SessionConfig {
    /// Whole seconds on the countdown
    pub fn countdown_ticks(&self) -> u64 {
        let tick = self.tick.as_millis().max(1);
        (self.countdown.as_millis() / tick).max(1) as u64
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(35 * 60),
            tick: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(5),
            end_marker: "interview complete".to_string(),
        }
    }
}
