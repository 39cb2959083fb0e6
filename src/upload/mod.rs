//! Recording uploads

mod archive;
mod cookie;
mod http;

pub use archive::ArchivingSink;
pub use cookie::cookie_value;
pub use http::{HttpUploader, UploadEndpoints};

use serde::{Deserialize, Serialize};

use crate::capture::MediaBlob;
use crate::error::SessionError;

/// Which session recording a blob is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    /// Display + combined audio
    Screen,
    /// Camera + microphone
    Video,
}

impl RecordingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingKind::Screen => "screen",
            RecordingKind::Video => "video",
        }
    }

    /// File name the blob is submitted under
    pub fn file_name(&self) -> String {
        format!("{}_recording.webm", self.as_str())
    }
}

impl std::fmt::Display for RecordingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for finalized session recordings
#[async_trait::async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload(&self, kind: RecordingKind, blob: MediaBlob) -> Result<(), SessionError>;
}
