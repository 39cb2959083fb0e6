use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SessionError;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A single device track
///
/// Clones share the same liveness flag, so a track placed in several streams
/// is stopped everywhere at once.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    kind: TrackKind,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Release the underlying device
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// An ordered set of tracks acquired together
#[derive(Debug, Clone, Default)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    /// True while at least one track is still live
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Build the stream recorded as the screen capture
///
/// Takes the first display video track, then the first system-audio track (if
/// the display share included one) and the first microphone track, so both
/// sides of the conversation end up in one recording.
pub fn combine_for_screen(
    display: &MediaStream,
    microphone: &MediaStream,
) -> Result<MediaStream, SessionError> {
    let video = display
        .video_tracks()
        .next()
        .cloned()
        .ok_or_else(|| SessionError::Device("display stream has no video track".to_string()))?;

    let mut tracks = vec![video];
    tracks.extend(display.audio_tracks().next().cloned());
    tracks.extend(microphone.audio_tracks().next().cloned());

    Ok(MediaStream::new(tracks))
}
