use serde::{Deserialize, Serialize};

/// What the interface should currently show
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub status: String,
    pub timer: String,
    pub response: String,
    pub start_visible: bool,
    pub stop_turn_visible: bool,
    pub stop_session_visible: bool,
    pub spinner_visible: bool,
    pub response_visible: bool,
}

impl SessionView {
    pub fn idle() -> Self {
        Self {
            start_visible: true,
            ..Self::default()
        }
    }

    /// Controls shown once a session has started
    pub fn show_session_controls(&mut self) {
        self.start_visible = false;
        self.stop_turn_visible = true;
        self.stop_session_visible = true;
        self.response_visible = true;
    }

    /// Reset to the idle layout, keeping the last status line
    pub fn reset(&mut self) {
        let status = std::mem::take(&mut self.status);
        *self = Self {
            status,
            ..Self::idle()
        };
    }
}

/// Countdown text, e.g. `Time remaining: 34:59`
pub fn format_remaining(seconds: u64) -> String {
    format!("Time remaining: {:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(2100), "Time remaining: 35:00");
        assert_eq!(format_remaining(2099), "Time remaining: 34:59");
        assert_eq!(format_remaining(5), "Time remaining: 00:05");
        assert_eq!(format_remaining(0), "Time remaining: 00:00");
    }

    #[test]
    fn test_reset_keeps_status() {
        let mut view = SessionView::idle();
        view.show_session_controls();
        view.status = "Session ended".to_string();
        view.timer = format_remaining(10);
        view.response = "Thanks".to_string();

        view.reset();

        assert_eq!(view.status, "Session ended");
        assert!(view.start_visible);
        assert!(!view.stop_session_visible);
        assert!(!view.response_visible);
        assert!(view.timer.is_empty());
        assert!(view.response.is_empty());
    }
}
