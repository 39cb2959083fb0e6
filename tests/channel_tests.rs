// Integration tests for the WebSocket voice channel
//
// These tests run the connector against a local tungstenite server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use interview_session::channel::{Channel, ChannelConnector, Inbound, WsConnector};
use interview_session::SessionError;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Accept one connection; frames received from the client go to the returned
/// receiver, frames pushed into the sender go to the client
async fn spawn_server() -> (String, mpsc::Receiver<Message>, mpsc::Sender<Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (from_client_tx, from_client_rx) = mpsc::channel(16);
    let (to_client_tx, mut to_client_rx) = mpsc::channel::<Message>(16);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                msg = stream.next() => match msg {
                    Some(Ok(msg)) => {
                        let _ = from_client_tx.send(msg).await;
                    }
                    _ => break,
                },
                out = to_client_rx.recv() => match out {
                    Some(Message::Close(frame)) => {
                        let _ = sink.send(Message::Close(frame)).await;
                        break;
                    }
                    Some(msg) => {
                        let _ = sink.send(msg).await;
                    }
                    None => break,
                },
            }
        }
    });

    (format!("ws://{}/ws/voice/", addr), from_client_rx, to_client_tx)
}

async fn next<T>(rx: &mut mpsc::Receiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

#[tokio::test]
async fn test_connect_and_send_turn_as_binary() {
    let (url, mut from_client, _to_client) = spawn_server().await;

    let link = WsConnector::new(url).connect().await.unwrap();
    assert!(link.channel.is_open());

    link.channel.send_audio(vec![1, 2, 3, 4]).await.unwrap();

    assert_eq!(next(&mut from_client).await, Message::Binary(vec![1, 2, 3, 4]));
}

#[tokio::test]
async fn test_server_frames_are_forwarded() {
    let (url, _from_client, to_client) = spawn_server().await;
    let mut link = WsConnector::new(url).connect().await.unwrap();

    to_client
        .send(Message::Text(r#"{"text":"Hello"}"#.to_string()))
        .await
        .unwrap();
    to_client.send(Message::Binary(vec![9, 9])).await.unwrap();

    assert_eq!(
        next(&mut link.inbound).await,
        Inbound::Text(r#"{"text":"Hello"}"#.to_string())
    );
    assert_eq!(next(&mut link.inbound).await, Inbound::Binary(vec![9, 9]));
}

#[tokio::test]
async fn test_server_close_is_reported() {
    let (url, _from_client, to_client) = spawn_server().await;
    let mut link = WsConnector::new(url).connect().await.unwrap();

    to_client.send(Message::Close(None)).await.unwrap();

    assert_eq!(next(&mut link.inbound).await, Inbound::Closed);
    assert!(!link.channel.is_open());

    let err = link.channel.send_audio(vec![0; 8]).await.unwrap_err();
    assert!(matches!(err, SessionError::Connection(_)));
}

#[tokio::test]
async fn test_client_close_marks_channel_closed() {
    let (url, mut from_client, _to_client) = spawn_server().await;
    let link = WsConnector::new(url).connect().await.unwrap();

    link.channel.close().await;

    assert!(!link.channel.is_open());
    assert!(matches!(next(&mut from_client).await, Message::Close(_)));
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WsConnector::new(format!("ws://{}/ws/voice/", addr)).connect().await;

    assert!(matches!(result, Err(SessionError::Connection(_))));
}
