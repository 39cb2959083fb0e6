//! Media capture
//!
//! Streams and tracks as handed out by the capture devices, the recorder
//! abstraction, and the file-backed replay devices.

mod replay;
mod stream;
mod unit;

pub use replay::{
    encode_wav, mix_to_mono, resample, ClipRecorder, ReplayConfig, ReplayDevices, WavTurnRecorder,
};
pub use stream::{combine_for_screen, MediaStream, MediaTrack, TrackKind};
pub use unit::{CaptureProfile, CaptureUnit, MediaBlob, MediaDevices};
