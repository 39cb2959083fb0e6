//! Voice channel to the conversation server
//!
//! Audio turns go up as binary frames; replies come back as JSON text frames.

mod reply;
mod ws;

pub use reply::{Reply, REPLY_AUDIO_MIME};
pub use ws::{WsChannel, WsConnector};

use tokio::sync::mpsc;

use crate::error::SessionError;

/// Frames and lifecycle notifications coming from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// The server closed the connection or the connection failed
    Closed,
}

/// Outbound half of an open channel
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    fn is_open(&self) -> bool;

    /// Send one recorded turn
    async fn send_audio(&self, audio: Vec<u8>) -> Result<(), SessionError>;

    async fn close(&self);
}

/// An open channel plus the stream of server frames
pub struct ChannelLink {
    pub channel: Box<dyn Channel>,
    pub inbound: mpsc::Receiver<Inbound>,
}

/// Opens channels to the server
#[async_trait::async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Resolves once the handshake has completed
    async fn connect(&self) -> Result<ChannelLink, SessionError>;
}
