use super::stream::MediaStream;
use crate::error::SessionError;

/// Recording parameters for each kind of capture unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureProfile {
    /// One spoken turn: 16kHz mono WAV
    Turn,
    /// Camera + microphone for the whole session
    Camera,
    /// Display + combined audio for the whole session
    Screen,
}

impl CaptureProfile {
    pub fn mime_type(&self) -> &'static str {
        match self {
            CaptureProfile::Turn => "audio/wav",
            CaptureProfile::Camera => "video/webm",
            CaptureProfile::Screen => "video/webm;codecs=vp8,opus",
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            CaptureProfile::Turn => 16000,
            CaptureProfile::Camera | CaptureProfile::Screen => 44100,
        }
    }

    pub fn audio_channels(&self) -> u16 {
        match self {
            CaptureProfile::Turn | CaptureProfile::Camera => 1,
            CaptureProfile::Screen => 2,
        }
    }

    /// Target bitrate for video profiles
    pub fn bits_per_second(&self) -> Option<u32> {
        match self {
            CaptureProfile::Turn => None,
            CaptureProfile::Camera | CaptureProfile::Screen => Some(128_000),
        }
    }
}

/// A finalized recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaBlob {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A recorder bound to one stream
///
/// A unit records once: `start`, then `finalize` flushes everything captured
/// into a blob. Callers create a new unit for every recording.
#[async_trait::async_trait]
pub trait CaptureUnit: Send {
    async fn start(&mut self) -> Result<(), SessionError>;

    /// Stop recording and return the captured media
    async fn finalize(&mut self) -> Result<MediaBlob, SessionError>;

    fn is_recording(&self) -> bool;

    fn profile(&self) -> CaptureProfile;
}

/// Access to the capture hardware
///
/// Each acquisition is independent; the caller owns the returned streams and
/// stops their tracks when done.
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    async fn camera_and_microphone(&self) -> Result<MediaStream, SessionError>;

    async fn display_with_system_audio(&self) -> Result<MediaStream, SessionError>;

    async fn microphone(&self) -> Result<MediaStream, SessionError>;

    /// Create an idle recorder for `stream`
    fn recorder(&self, stream: &MediaStream, profile: CaptureProfile) -> Box<dyn CaptureUnit>;
}
