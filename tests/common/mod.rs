// Test doubles for the session collaborators
//
// Every fake records what the controller did to it so tests can assert on
// device usage, channel traffic, uploads and playback.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use interview_session::capture::{
    CaptureProfile, CaptureUnit, MediaBlob, MediaDevices, MediaStream, MediaTrack, TrackKind,
};
use interview_session::channel::{Channel, ChannelConnector, ChannelLink, Inbound};
use interview_session::session::{Collaborators, SessionConfig, SessionController, SessionEvent};
use interview_session::upload::{RecordingKind, UploadSink};
use interview_session::{ReplyPlayer, SessionError};
use tokio::sync::{broadcast, mpsc, Notify};

// ============================================================================
// Channel
// ============================================================================

#[derive(Default)]
pub struct ChannelProbe {
    pub open: AtomicBool,
    pub closed_by_client: AtomicBool,
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub inbound: Mutex<Option<mpsc::Sender<Inbound>>>,
}

pub struct FakeConnector {
    pub probe: Arc<ChannelProbe>,
    pub connects: AtomicUsize,
    pub handshake_delay: Option<Duration>,
    pub refuse: bool,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(ChannelProbe::default()),
            connects: AtomicUsize::new(0),
            handshake_delay: None,
            refuse: false,
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.probe.sent.lock().unwrap().clone()
    }

    pub fn is_open(&self) -> bool {
        self.probe.open.load(Ordering::SeqCst)
    }

    /// Drop the connection without telling the controller
    pub fn break_silently(&self) {
        self.probe.open.store(false, Ordering::SeqCst);
    }

    /// Push a text frame as the server
    pub async fn push_text(&self, text: &str) {
        let tx = self.probe.inbound.lock().unwrap().clone().expect("channel not connected");
        tx.send(Inbound::Text(text.to_string())).await.unwrap();
    }

    /// Close the connection from the server side
    pub async fn close_from_server(&self) {
        self.probe.open.store(false, Ordering::SeqCst);
        let tx = self.probe.inbound.lock().unwrap().clone().expect("channel not connected");
        tx.send(Inbound::Closed).await.unwrap();
    }
}

#[async_trait::async_trait]
impl ChannelConnector for FakeConnector {
    async fn connect(&self) -> Result<ChannelLink, SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.handshake_delay {
            tokio::time::sleep(delay).await;
        }
        if self.refuse {
            return Err(SessionError::Connection("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::channel(16);
        *self.probe.inbound.lock().unwrap() = Some(tx);
        self.probe.open.store(true, Ordering::SeqCst);
        self.probe.closed_by_client.store(false, Ordering::SeqCst);

        Ok(ChannelLink {
            channel: Box::new(FakeChannel {
                probe: Arc::clone(&self.probe),
            }),
            inbound: rx,
        })
    }
}

struct FakeChannel {
    probe: Arc<ChannelProbe>,
}

#[async_trait::async_trait]
impl Channel for FakeChannel {
    fn is_open(&self) -> bool {
        self.probe.open.load(Ordering::SeqCst)
    }

    async fn send_audio(&self, audio: Vec<u8>) -> Result<(), SessionError> {
        self.probe.sent.lock().unwrap().push(audio);
        Ok(())
    }

    async fn close(&self) {
        self.probe.open.store(false, Ordering::SeqCst);
        self.probe.closed_by_client.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Default)]
pub struct DeviceProbe {
    pub active_turns: AtomicUsize,
    pub max_active_turns: AtomicUsize,
    pub turns_created: AtomicUsize,
    pub finalized: Mutex<Vec<CaptureProfile>>,
    pub tracks: Mutex<Vec<MediaTrack>>,
}

#[derive(Default)]
pub struct FakeDevices {
    pub probe: Arc<DeviceProbe>,
    pub deny_camera: bool,
    pub deny_display: bool,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self, kinds: &[(TrackKind, &str)]) -> MediaStream {
        let tracks: Vec<MediaTrack> = kinds
            .iter()
            .map(|(kind, label)| MediaTrack::new(*kind, *label))
            .collect();
        self.probe.tracks.lock().unwrap().extend(tracks.iter().cloned());
        MediaStream::new(tracks)
    }

    pub fn live_tracks(&self) -> usize {
        self.probe
            .tracks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_live())
            .count()
    }

    pub fn finalized(&self, profile: CaptureProfile) -> usize {
        self.probe
            .finalized
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == profile)
            .count()
    }
}

#[async_trait::async_trait]
impl MediaDevices for FakeDevices {
    async fn camera_and_microphone(&self) -> Result<MediaStream, SessionError> {
        if self.deny_camera {
            return Err(SessionError::Device("Permission denied".to_string()));
        }
        Ok(self.stream(&[(TrackKind::Audio, "mic"), (TrackKind::Video, "camera")]))
    }

    async fn display_with_system_audio(&self) -> Result<MediaStream, SessionError> {
        if self.deny_display {
            return Err(SessionError::Device("Permission denied".to_string()));
        }
        Ok(self.stream(&[(TrackKind::Video, "display"), (TrackKind::Audio, "system")]))
    }

    async fn microphone(&self) -> Result<MediaStream, SessionError> {
        Ok(self.stream(&[(TrackKind::Audio, "mic")]))
    }

    fn recorder(&self, _stream: &MediaStream, profile: CaptureProfile) -> Box<dyn CaptureUnit> {
        Box::new(FakeUnit {
            probe: Arc::clone(&self.probe),
            profile,
            recording: false,
        })
    }
}

struct FakeUnit {
    probe: Arc<DeviceProbe>,
    profile: CaptureProfile,
    recording: bool,
}

#[async_trait::async_trait]
impl CaptureUnit for FakeUnit {
    async fn start(&mut self) -> Result<(), SessionError> {
        assert!(!self.recording, "capture unit started twice");
        self.recording = true;

        if self.profile == CaptureProfile::Turn {
            self.probe.turns_created.fetch_add(1, Ordering::SeqCst);
            let active = self.probe.active_turns.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.max_active_turns.fetch_max(active, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<MediaBlob, SessionError> {
        assert!(self.recording, "capture unit finalized twice");
        self.recording = false;

        if self.profile == CaptureProfile::Turn {
            self.probe.active_turns.fetch_sub(1, Ordering::SeqCst);
        }
        self.probe.finalized.lock().unwrap().push(self.profile);

        Ok(MediaBlob::new(self.profile.mime_type(), vec![7u8; 32]))
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn profile(&self) -> CaptureProfile {
        self.profile
    }
}

// ============================================================================
// Uploads
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub uploads: Mutex<Vec<(RecordingKind, usize)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn count(&self, kind: RecordingKind) -> usize {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn total(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl UploadSink for RecordingSink {
    async fn upload(&self, kind: RecordingKind, blob: MediaBlob) -> Result<(), SessionError> {
        self.uploads.lock().unwrap().push((kind, blob.len()));
        if self.fail {
            return Err(SessionError::Upload("server returned 500".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Playback
// ============================================================================

/// Player whose playback ends only when the test says so
#[derive(Default)]
pub struct ManualPlayer {
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub clips: Mutex<Vec<Vec<u8>>>,
    finish: Notify,
}

impl ManualPlayer {
    pub fn finish_playback(&self) {
        self.finish.notify_one();
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReplyPlayer for ManualPlayer {
    async fn play(&self, clip: MediaBlob) -> Result<(), SessionError> {
        self.clips.lock().unwrap().push(clip.data);
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.finish.notified().await;
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub connector: Arc<FakeConnector>,
    pub devices: Arc<FakeDevices>,
    pub sink: Arc<RecordingSink>,
    pub player: Arc<ManualPlayer>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(SessionConfig::default(), FakeConnector::new(), FakeDevices::new(), RecordingSink::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::build(config, FakeConnector::new(), FakeDevices::new(), RecordingSink::default())
    }

    pub fn build(
        config: SessionConfig,
        connector: FakeConnector,
        devices: FakeDevices,
        sink: RecordingSink,
    ) -> Self {
        let connector = Arc::new(connector);
        let devices = Arc::new(devices);
        let sink = Arc::new(sink);
        let player = Arc::new(ManualPlayer::default());

        let controller = SessionController::new(
            config,
            Collaborators {
                connector: connector.clone(),
                devices: devices.clone(),
                uploader: sink.clone(),
                player: player.clone(),
            },
        );

        Self {
            controller,
            connector,
            devices,
            sink,
            player,
        }
    }
}

/// JSON reply frame carrying `text` and a small audio payload
pub fn reply_with_audio(text: &str) -> String {
    let audio = base64::engine::general_purpose::STANDARD.encode(b"ID3 fake mp3 payload");
    serde_json::json!({ "text": text, "audio": audio }).to_string()
}

/// Wait for an event matching `pred`, giving up after `within`
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    within: Duration,
    pred: F,
) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(within, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

/// Poll `check` until it holds
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
