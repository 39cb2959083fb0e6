use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::decode::{decode_audio, DecodedAudio};
use crate::capture::{encode_wav, MediaBlob};
use crate::error::SessionError;

/// Plays synthesized replies
#[async_trait::async_trait]
pub trait ReplyPlayer: Send + Sync {
    /// Play `clip`, resolving when playback has ended
    async fn play(&self, clip: MediaBlob) -> Result<(), SessionError>;

    /// Cut the current playback short and rewind
    fn stop(&self);
}

/// Player for hosts without an audio output
///
/// Decodes each reply, optionally writes it out as WAV, and holds for the
/// clip's duration so turn-taking keeps real-time pacing.
pub struct HeadlessPlayer {
    replies_dir: Option<PathBuf>,
    stop_tx: watch::Sender<u64>,
}

impl HeadlessPlayer {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(0);
        Self {
            replies_dir: None,
            stop_tx,
        }
    }

    /// Write every decoded reply into `dir`
    pub fn with_replies_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.replies_dir = Some(dir.into());
        self
    }

    async fn write_reply(&self, audio: &DecodedAudio) -> Result<PathBuf, SessionError> {
        let Some(dir) = &self.replies_dir else {
            return Err(SessionError::Playback("no replies directory".to_string()));
        };

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SessionError::Playback(e.to_string()))?;

        let path = dir.join(format!("reply_{}.wav", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        let wav = encode_wav(&audio.to_i16(), audio.sample_rate, audio.channels)?;
        tokio::fs::write(&path, wav)
            .await
            .map_err(|e| SessionError::Playback(e.to_string()))?;

        Ok(path)
    }
}

impl Default for HeadlessPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReplyPlayer for HeadlessPlayer {
    async fn play(&self, clip: MediaBlob) -> Result<(), SessionError> {
        let mut stop_rx = self.stop_tx.subscribe();

        let audio = tokio::task::spawn_blocking(move || decode_audio(&clip.data))
            .await
            .map_err(|e| SessionError::Playback(format!("decoder task failed: {}", e)))??;

        let duration = Duration::from_secs_f64(audio.duration_seconds());
        info!(
            "Playing reply: {:.1}s, {}Hz, {} channels",
            duration.as_secs_f64(),
            audio.sample_rate,
            audio.channels
        );

        if self.replies_dir.is_some() {
            match self.write_reply(&audio).await {
                Ok(path) => debug!("Reply written to {}", path.display()),
                Err(e) => warn!("Failed to write reply audio: {}", e),
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => debug!("Reply playback ended"),
            _ = stop_rx.changed() => debug!("Reply playback stopped"),
        }

        Ok(())
    }

    fn stop(&self) {
        self.stop_tx.send_modify(|generation| *generation += 1);
    }
}
