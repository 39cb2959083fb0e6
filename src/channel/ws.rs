use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::{Channel, ChannelConnector, ChannelLink, Inbound};
use crate::error::SessionError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Inbound frames buffered before the controller picks them up
const INBOUND_BUFFER: usize = 64;

/// Connects to the voice endpoint over WebSocket
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl ChannelConnector for WsConnector {
    async fn connect(&self) -> Result<ChannelLink, SessionError> {
        info!("Connecting to voice channel at {}", self.url);

        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (sink, mut stream) = ws_stream.split();

        let open = Arc::new(AtomicBool::new(true));
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        let reader_open = Arc::clone(&open);
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let inbound = match msg {
                    Ok(Message::Text(text)) => Inbound::Text(text),
                    Ok(Message::Binary(data)) => Inbound::Binary(data),
                    Ok(Message::Close(frame)) => {
                        info!("Voice channel closed by server: {:?}", frame);
                        break;
                    }
                    Ok(_) => {
                        trace!("Ignoring control frame");
                        continue;
                    }
                    Err(e) => {
                        error!("Voice channel receive error: {}", e);
                        break;
                    }
                };

                if inbound_tx.send(inbound).await.is_err() {
                    debug!("Inbound receiver dropped, stopping reader");
                    break;
                }
            }

            reader_open.store(false, Ordering::SeqCst);
            let _ = inbound_tx.send(Inbound::Closed).await;
        });

        info!("Voice channel connected");

        Ok(ChannelLink {
            channel: Box::new(WsChannel {
                sink: Mutex::new(sink),
                open,
            }),
            inbound: inbound_rx,
        })
    }
}

/// Write half of a WebSocket voice channel
pub struct WsChannel {
    sink: Mutex<WsSink>,
    open: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl Channel for WsChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_audio(&self, audio: Vec<u8>) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::Connection("channel is not open".to_string()));
        }

        let len = audio.len();
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Binary(audio)).await {
            self.open.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        debug!("Sent {} bytes of turn audio", len);
        Ok(())
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            warn!("Failed to close voice channel cleanly: {}", e);
        }
    }
}
