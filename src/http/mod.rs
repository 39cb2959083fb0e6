//! HTTP API for driving the session from a local page or script
//!
//! This module stands in for the interview page's buttons:
//! - POST /session/start - Start a session
//! - POST /session/turn/start - Start recording a turn
//! - POST /session/turn/stop - Stop the turn and send it
//! - POST /session/stop - End the session
//! - GET /session/status - Session statistics
//! - GET /session/view - What the interface should show
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
