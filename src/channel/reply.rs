use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::capture::MediaBlob;
use crate::error::SessionError;

/// Content type of synthesized reply audio
pub const REPLY_AUDIO_MIME: &str = "audio/mp3";

/// Reply pushed by the server after each turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub text: Option<String>,

    /// Base64-encoded speech
    #[serde(default)]
    pub audio: Option<String>,
}

impl Reply {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw).map_err(|e| SessionError::MalformedReply(e.to_string()))
    }

    /// Reply text, if present and non-empty
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_audio(&self) -> bool {
        self.audio.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Decode the speech payload, if any
    pub fn decode_audio(&self) -> Result<Option<MediaBlob>, SessionError> {
        if !self.has_audio() {
            return Ok(None);
        }
        let encoded = self.audio.as_deref().unwrap_or_default();

        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| SessionError::MalformedReply(format!("invalid audio payload: {}", e)))?;

        Ok(Some(MediaBlob::new(REPLY_AUDIO_MIME, data)))
    }

    /// Whether the text announces the end of the session
    pub fn signals_end(&self, marker: &str) -> bool {
        if marker.is_empty() {
            return false;
        }

        self.text()
            .is_some_and(|t| t.to_lowercase().contains(&marker.to_lowercase()))
    }
}
