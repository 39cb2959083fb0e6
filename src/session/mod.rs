//! Interview session management
//!
//! This module provides the `SessionController` that drives one interview:
//! - Voice channel lifecycle and turn transmission
//! - Camera, screen and per-turn audio capture
//! - Reply playback and automatic turn-taking
//! - Countdown, teardown and recording uploads

mod config;
mod controller;
mod countdown;
mod state;
mod stats;
mod view;

pub use config::SessionConfig;
pub use controller::{Collaborators, SessionController};
pub use countdown::spawn_countdown;
pub use state::{Session, SessionEvent, SessionState};
pub use stats::SessionStats;
pub use view::{format_remaining, SessionView};
