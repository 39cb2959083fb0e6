pub mod audio;
pub mod capture;
pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod upload;

pub use audio::{HeadlessPlayer, ReplyPlayer};
pub use capture::{
    CaptureProfile, CaptureUnit, MediaBlob, MediaDevices, MediaStream, MediaTrack, ReplayDevices,
    TrackKind,
};
pub use channel::{Channel, ChannelConnector, ChannelLink, Inbound, Reply, WsConnector};
pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use session::{
    Collaborators, SessionConfig, SessionController, SessionEvent, SessionState, SessionStats,
    SessionView,
};
pub use upload::{ArchivingSink, HttpUploader, RecordingKind, UploadSink};
