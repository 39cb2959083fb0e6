use super::config::SessionConfig;
use super::countdown::spawn_countdown;
use super::state::{Session, SessionEvent, SessionState};
use super::stats::SessionStats;
use super::view::{format_remaining, SessionView};
use crate::audio::ReplyPlayer;
use crate::capture::{combine_for_screen, CaptureProfile, CaptureUnit, MediaBlob, MediaDevices, MediaStream};
use crate::channel::{Channel, ChannelConnector, ChannelLink, Inbound, Reply};
use crate::error::SessionError;
use crate::upload::{RecordingKind, UploadSink};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events buffered per subscriber before it starts lagging
const EVENT_BUFFER: usize = 1024;

const CONNECTION_LOST: &str = "Connection lost. Please restart the session.";

/// External services the controller drives
#[derive(Clone)]
pub struct Collaborators {
    pub connector: Arc<dyn ChannelConnector>,
    pub devices: Arc<dyn MediaDevices>,
    pub uploader: Arc<dyn UploadSink>,
    pub player: Arc<dyn ReplyPlayer>,
}

/// Drives one interview at a time: channel, captures, turns, replies, teardown
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

struct Shared {
    config: SessionConfig,
    collaborators: Collaborators,
    inner: Mutex<Inner>,

    /// Set for the whole duration of a teardown
    ending: AtomicBool,

    turns_sent: AtomicUsize,
    replies_received: AtomicUsize,
    events: broadcast::Sender<SessionEvent>,
    view: watch::Sender<SessionView>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    session: Option<Session>,
    live: Option<LiveSession>,
}

/// Everything acquired for the running session
struct LiveSession {
    channel: Box<dyn Channel>,
    camera: Option<MediaStream>,
    display: Option<MediaStream>,
    microphone: Option<MediaStream>,
    combined: Option<MediaStream>,
    video: Option<Box<dyn CaptureUnit>>,
    screen: Option<Box<dyn CaptureUnit>>,
    turn: Option<Box<dyn CaptureUnit>>,
    countdown: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    playback: Option<JoinHandle<()>>,

    /// End the session once the current reply finishes playing
    end_after_playback: bool,
}

impl LiveSession {
    fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel,
            camera: None,
            display: None,
            microphone: None,
            combined: None,
            video: None,
            screen: None,
            turn: None,
            countdown: None,
            listener: None,
            playback: None,
            end_after_playback: false,
        }
    }

    fn turn_recording(&self) -> bool {
        self.turn.as_ref().is_some_and(|t| t.is_recording())
    }

    fn stop_tracks(&self) {
        [&self.combined, &self.display, &self.microphone, &self.camera]
            .into_iter()
            .flatten()
            .for_each(MediaStream::stop_all);
    }
}

impl SessionController {
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (view, _) = watch::channel(SessionView::idle());

        Self {
            shared: Arc::new(Shared {
                config,
                collaborators,
                inner: Mutex::new(Inner::default()),
                ending: AtomicBool::new(false),
                turns_sent: AtomicUsize::new(0),
                replies_received: AtomicUsize::new(0),
                events,
                view,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn watch_view(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    /// Snapshot of the interface state
    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    pub async fn state(&self) -> SessionState {
        self.shared.inner.lock().await.state
    }

    pub async fn session(&self) -> Option<Session> {
        self.shared.inner.lock().await.session.clone()
    }

    pub async fn stats(&self) -> SessionStats {
        let inner = self.shared.inner.lock().await;
        let started_at = inner.session.as_ref().map(|s| s.started_at);
        let duration_secs = started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            state: inner.state,
            session_id: inner.session.as_ref().map(|s| s.id.clone()),
            started_at,
            duration_secs,
            remaining_seconds: inner.session.as_ref().map(|s| s.remaining_seconds),
            turns_sent: self.shared.turns_sent.load(Ordering::SeqCst),
            replies_received: self.shared.replies_received.load(Ordering::SeqCst),
        }
    }

    /// Open the channel, acquire devices and begin recording
    ///
    /// Returns once the channel is open and every capture is running. The
    /// first turn starts automatically.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state != SessionState::Idle || self.is_ending() {
            warn!("Session already active");
            return Err(SessionError::AlreadyActive);
        }

        info!("Starting interview session");
        self.set_status("Connecting...");

        let ChannelLink { channel, inbound } = match self.open_channel().await {
            Ok(link) => link,
            Err(e) => return Err(self.start_failed(e)),
        };

        let mut live = LiveSession::new(channel);
        if let Err(e) = self.acquire_captures(&mut live).await {
            live.stop_tracks();
            live.channel.close().await;
            return Err(self.start_failed(e));
        }

        let session = Session::new(self.shared.config.countdown_ticks());
        let remaining = session.remaining_seconds;
        let session_id = session.id.clone();
        info!("Session {} started ({}s countdown)", session_id, remaining);
        inner.session = Some(session);

        live.listener = Some(self.spawn_listener(session_id.clone(), inbound));
        live.countdown = Some(self.spawn_countdown(session_id));
        inner.live = Some(live);

        self.shared.view.send_modify(|v| {
            v.show_session_controls();
            v.timer = format_remaining(remaining);
            v.response.clear();
        });
        self.set_state(&mut inner, SessionState::Waiting);
        self.set_status("Session started - Recording automatically");

        self.begin_turn_locked(&mut inner).await;

        Ok(())
    }

    /// Start recording a turn
    ///
    /// Returns `false` without doing anything when no session is active or a
    /// turn is already recording.
    pub async fn begin_recording_turn(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        self.begin_turn_locked(&mut inner).await
    }

    /// Stop the current turn and send it to the server
    ///
    /// Returns `false` when no turn was recording.
    pub async fn end_recording_turn(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;

        let turn = match inner.live.as_mut().and_then(|live| live.turn.take()) {
            Some(turn) if turn.is_recording() => turn,
            _ => {
                debug!("No turn recording");
                return false;
            }
        };

        self.set_state(&mut inner, SessionState::Processing);
        self.shared.view.send_modify(|v| {
            v.stop_turn_visible = false;
            v.spinner_visible = true;
        });

        let channel = match inner.live.as_ref() {
            Some(live) => live.channel.as_ref(),
            None => return false,
        };
        let result = self.finish_turn(turn, channel).await;

        match result {
            Ok(_) => self.set_status("Processing..."),
            Err(SessionError::Connection(e)) => {
                warn!("Turn not sent: {}", e);
                self.set_status(CONNECTION_LOST);
            }
            Err(e) => {
                error!("Failed to finalize turn: {}", e);
                self.set_status(format!("Recording failed: {}", e));
                self.set_state(&mut inner, SessionState::Waiting);
                self.begin_turn_locked(&mut inner).await;
            }
        }

        true
    }

    /// Handle one text frame from the server
    ///
    /// Malformed frames are logged and dropped without touching the session.
    pub async fn on_reply(&self, raw: &str) {
        self.shared.replies_received.fetch_add(1, Ordering::SeqCst);

        let reply = match Reply::parse(raw) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Error handling message: {}", e);
                debug!("Raw response data: {}", raw);
                return;
            }
        };

        let mut inner = self.shared.inner.lock().await;
        if !inner.state.is_active() || self.is_ending() {
            debug!("Ignoring reply outside an active session");
            return;
        }

        if let Some(text) = reply.text() {
            info!("Reply: {}", text);
            let text = text.to_string();
            self.shared.view.send_modify(|v| v.response = text.clone());
            self.emit(SessionEvent::Response(text));
        }

        let ends_session = reply.signals_end(&self.shared.config.end_marker);
        let clip = reply.decode_audio().unwrap_or_else(|e| {
            warn!("Dropping reply audio: {}", e);
            None
        });

        let Some(clip) = clip else {
            if ends_session {
                info!("Interview complete without reply audio, ending session");
                if let Some(session) = inner.session.as_ref() {
                    self.spawn_end(session.id.clone());
                }
            }
            return;
        };

        let Some(live) = inner.live.as_mut() else {
            return;
        };

        if ends_session {
            info!("Interview complete detected, waiting for audio to finish...");
            live.end_after_playback = true;
        }

        if let Some(previous) = live.playback.take() {
            previous.abort();
            self.shared.collaborators.player.stop();
        }
        live.playback = Some(self.spawn_playback(clip));

        if !live.turn_recording() {
            self.set_state(&mut inner, SessionState::Waiting);
        }
        self.shared.view.send_modify(|v| v.spinner_visible = false);
        self.set_status("Playing response...");
    }

    /// Tear the session down and return to idle
    ///
    /// Safe to call from any state, repeatedly and concurrently; only the
    /// first call does the work.
    pub async fn end(&self) {
        self.end_session(None).await
    }

    /// Tear down the live session, but only if it is `expected` (any when `None`)
    async fn end_session(&self, expected: Option<&str>) {
        let live = {
            let mut inner = self.shared.inner.lock().await;

            if let Some(id) = expected {
                if inner.session.as_ref().map(|s| s.id.as_str()) != Some(id) {
                    debug!("Session {} already over, not ending", id);
                    return;
                }
            }

            if self
                .shared
                .ending
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("Session already ending");
                return;
            }

            let Some(live) = inner.live.take() else {
                self.shared.ending.store(false, Ordering::SeqCst);
                return;
            };

            if let Some(session) = inner.session.as_mut() {
                session.active = false;
            }
            self.set_state(&mut inner, SessionState::Ending);
            live
        };

        info!("Ending session");
        self.set_status("Session ended");
        self.teardown(live).await;

        {
            let mut inner = self.shared.inner.lock().await;
            inner.session = None;
            self.set_state(&mut inner, SessionState::Idle);
            self.shared.view.send_modify(SessionView::reset);
            self.emit(SessionEvent::Ended);
            self.shared.ending.store(false, Ordering::SeqCst);
        }

        info!("Session ended");
    }

    fn is_ending(&self) -> bool {
        self.shared.ending.load(Ordering::SeqCst)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }

    fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        debug!("Status: {}", status);
        self.shared.view.send_modify(|v| v.status = status.clone());
        self.emit(SessionEvent::Status(status));
    }

    fn set_state(&self, inner: &mut Inner, state: SessionState) {
        if inner.state != state {
            debug!("Session state {:?} -> {:?}", inner.state, state);
            inner.state = state;
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    fn start_failed(&self, err: SessionError) -> SessionError {
        error!("Error starting session: {}", err);
        self.set_status(format!("Failed to start session: {}", err));
        err
    }

    async fn open_channel(&self) -> Result<ChannelLink, SessionError> {
        let timeout = self.shared.config.handshake_timeout;

        match tokio::time::timeout(timeout, self.shared.collaborators.connector.connect()).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Connection(format!(
                "handshake did not complete within {:.1}s",
                timeout.as_secs_f64()
            ))),
        }
    }

    /// Acquire camera, display and microphone and start the session-long recordings
    ///
    /// Streams are stored in `live` as soon as they are acquired so a failure
    /// part-way through can release them.
    async fn acquire_captures(&self, live: &mut LiveSession) -> Result<(), SessionError> {
        let devices = &self.shared.collaborators.devices;

        let camera = devices.camera_and_microphone().await?;
        live.camera = Some(camera.clone());
        let mut video = devices.recorder(&camera, CaptureProfile::Camera);
        video.start().await?;
        live.video = Some(video);

        let display = devices.display_with_system_audio().await?;
        live.display = Some(display.clone());
        let microphone = devices.microphone().await?;
        live.microphone = Some(microphone.clone());

        let combined = combine_for_screen(&display, &microphone)?;
        live.combined = Some(combined.clone());
        let mut screen = devices.recorder(&combined, CaptureProfile::Screen);
        screen.start().await?;
        live.screen = Some(screen);

        info!("Screen recording started with system and user audio");
        Ok(())
    }

    async fn begin_turn_locked(&self, inner: &mut Inner) -> bool {
        if !inner.state.is_active() || self.is_ending() {
            debug!("No active session, not starting a turn");
            return false;
        }

        let Some(live) = inner.live.as_mut() else {
            return false;
        };
        if live.turn_recording() {
            debug!("Turn already recording");
            return false;
        }
        let Some(camera) = live.camera.as_ref() else {
            return false;
        };

        let mut turn = self
            .shared
            .collaborators
            .devices
            .recorder(camera, CaptureProfile::Turn);
        if let Err(e) = turn.start().await {
            error!("Failed to start turn recording: {}", e);
            self.set_status(format!("Failed to start recording: {}", e));
            return false;
        }
        live.turn = Some(turn);

        self.set_state(inner, SessionState::Recording);
        self.shared.view.send_modify(|v| {
            v.spinner_visible = false;
            v.stop_turn_visible = true;
        });
        self.set_status("Recording...");

        true
    }

    /// Finalize a turn and send it if the channel is still open
    ///
    /// Never queues: a closed channel drops the turn.
    async fn finish_turn(
        &self,
        mut turn: Box<dyn CaptureUnit>,
        channel: &dyn Channel,
    ) -> Result<usize, SessionError> {
        let blob = turn.finalize().await?;
        let bytes = blob.len();

        if !channel.is_open() {
            return Err(SessionError::Connection(format!(
                "channel not open, dropped {} byte turn",
                bytes
            )));
        }
        channel.send_audio(blob.data).await?;

        self.shared.turns_sent.fetch_add(1, Ordering::SeqCst);
        self.emit(SessionEvent::TurnSent { bytes });
        info!("Turn sent ({} bytes)", bytes);

        Ok(bytes)
    }

    async fn teardown(&self, mut live: LiveSession) {
        for task in [live.countdown.take(), live.listener.take()].into_iter().flatten() {
            task.abort();
        }

        if let Some(turn) = live.turn.take().filter(|t| t.is_recording()) {
            if let Err(e) = self.finish_turn(turn, live.channel.as_ref()).await {
                warn!("Final turn not delivered: {}", e);
            }
        }

        if let Some(playback) = live.playback.take() {
            playback.abort();
        }
        self.shared.collaborators.player.stop();

        if let Some(video) = live.video.take() {
            self.finalize_and_upload(RecordingKind::Video, video).await;
        }
        if let Some(screen) = live.screen.take() {
            self.finalize_and_upload(RecordingKind::Screen, screen).await;
        }

        live.stop_tracks();
        live.channel.close().await;
    }

    async fn finalize_and_upload(&self, kind: RecordingKind, mut unit: Box<dyn CaptureUnit>) {
        if !unit.is_recording() {
            debug!("{} recorder already stopped", kind);
            return;
        }

        let blob = match unit.finalize().await {
            Ok(blob) => blob,
            Err(e) => {
                error!("Failed to finalize {} recording: {}", kind, e);
                self.emit(SessionEvent::UploadFailed {
                    kind,
                    error: e.to_string(),
                });
                return;
            }
        };

        match self.shared.collaborators.uploader.upload(kind, blob).await {
            Ok(()) => self.emit(SessionEvent::Uploaded { kind }),
            Err(e) => {
                error!("Error uploading {}: {}", kind, e);
                self.emit(SessionEvent::UploadFailed {
                    kind,
                    error: e.to_string(),
                });
            }
        }
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// End session `id` from a detached task
    ///
    /// Background tasks are aborted during teardown, so they must not run it
    /// themselves. The task does nothing if `id` is no longer the live session.
    fn spawn_end(&self, id: String) {
        let controller = self.clone();
        tokio::spawn(async move { controller.end_session(Some(&id)).await });
    }

    fn spawn_listener(&self, session_id: String, mut inbound: mpsc::Receiver<Inbound>) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);

        tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                let Some(controller) = Self::upgrade(&weak) else {
                    return;
                };

                match frame {
                    Inbound::Text(raw) => controller.on_reply(&raw).await,
                    Inbound::Binary(data) => {
                        controller.shared.replies_received.fetch_add(1, Ordering::SeqCst);
                        warn!("Ignoring {} byte binary frame from server", data.len());
                    }
                    Inbound::Closed => break,
                }
            }

            if let Some(controller) = Self::upgrade(&weak) {
                controller.channel_closed(session_id).await;
            }
        })
    }

    async fn channel_closed(&self, session_id: String) {
        let current = {
            let inner = self.shared.inner.lock().await;
            inner.state.is_active()
                && inner.session.as_ref().is_some_and(|s| s.id == session_id)
        };
        if current && !self.is_ending() {
            warn!("Voice channel closed during an active session");
            self.set_status("Connection closed unexpectedly");
            self.spawn_end(session_id);
        }
    }

    fn spawn_countdown(&self, session_id: String) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);

        spawn_countdown(self.shared.config.tick, move || {
            let weak = weak.clone();
            let session_id = session_id.clone();
            async move {
                let Some(controller) = Self::upgrade(&weak) else {
                    return false;
                };

                match controller.tick().await {
                    Some(0) => {
                        info!("Session time is up");
                        controller.spawn_end(session_id);
                        false
                    }
                    Some(_) => true,
                    None => false,
                }
            }
        })
    }

    /// One countdown step; returns the seconds left, or `None` when no session runs
    async fn tick(&self) -> Option<u64> {
        let remaining = {
            let mut inner = self.shared.inner.lock().await;
            if !inner.state.is_active() {
                return None;
            }
            let session = inner.session.as_mut()?;
            session.remaining_seconds = session.remaining_seconds.saturating_sub(1);
            session.remaining_seconds
        };

        self.shared
            .view
            .send_modify(|v| v.timer = format_remaining(remaining));
        self.emit(SessionEvent::Tick { remaining });

        Some(remaining)
    }

    fn spawn_playback(&self, clip: MediaBlob) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        let player = Arc::clone(&self.shared.collaborators.player);

        tokio::spawn(async move {
            if let Err(e) = player.play(clip).await {
                error!("Error playing audio: {}", e);
            }

            if let Some(controller) = Self::upgrade(&weak) {
                controller.playback_finished().await;
            }
        })
    }

    /// Reply audio ended: either close the interview or hand the floor back
    async fn playback_finished(&self) {
        let mut inner = self.shared.inner.lock().await;

        let end_after_playback = match inner.live.as_mut() {
            Some(live) => {
                live.playback = None;
                live.end_after_playback
            }
            None => return,
        };

        if end_after_playback {
            info!("Audio finished, ending session...");
            if let Some(session) = inner.session.as_ref() {
                self.spawn_end(session.id.clone());
            }
            return;
        }

        self.begin_turn_locked(&mut inner).await;
    }
}
