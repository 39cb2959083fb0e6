//! File-backed capture devices
//!
//! Stands in for real hardware on hosts without camera/display capture:
//! the microphone replays a WAV fixture, camera and screen recordings are
//! pre-recorded WebM clips. Missing fixtures behave like missing devices.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};

use super::stream::{MediaStream, MediaTrack, TrackKind};
use super::unit::{CaptureProfile, CaptureUnit, MediaBlob, MediaDevices};
use crate::error::SessionError;

/// Input frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Fixture locations for the replay devices
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// WAV file replayed by the microphone (looped as needed)
    pub microphone_wav: Option<PathBuf>,
    /// WebM clip returned by the camera recording
    pub camera_clip: Option<PathBuf>,
    /// WebM clip returned by the screen recording
    pub screen_clip: Option<PathBuf>,
}

pub struct ReplayDevices {
    config: ReplayConfig,
}

impl ReplayDevices {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    fn fixture<'a>(path: &'a Option<PathBuf>, device: &str) -> Result<&'a Path, SessionError> {
        match path {
            Some(p) if p.exists() => Ok(p.as_path()),
            Some(p) => Err(SessionError::Device(format!(
                "{} fixture not found: {}",
                device,
                p.display()
            ))),
            None => Err(SessionError::Device(format!("no {} device present", device))),
        }
    }
}

#[async_trait::async_trait]
impl MediaDevices for ReplayDevices {
    async fn camera_and_microphone(&self) -> Result<MediaStream, SessionError> {
        Self::fixture(&self.config.camera_clip, "camera")?;
        Self::fixture(&self.config.microphone_wav, "microphone")?;

        Ok(MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio, "replay microphone"),
            MediaTrack::new(TrackKind::Video, "replay camera"),
        ]))
    }

    async fn display_with_system_audio(&self) -> Result<MediaStream, SessionError> {
        Self::fixture(&self.config.screen_clip, "display")?;

        Ok(MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "replay display"),
            MediaTrack::new(TrackKind::Audio, "replay system audio"),
        ]))
    }

    async fn microphone(&self) -> Result<MediaStream, SessionError> {
        Self::fixture(&self.config.microphone_wav, "microphone")?;

        Ok(MediaStream::new(vec![MediaTrack::new(
            TrackKind::Audio,
            "replay microphone",
        )]))
    }

    fn recorder(&self, stream: &MediaStream, profile: CaptureProfile) -> Box<dyn CaptureUnit> {
        match profile {
            CaptureProfile::Turn => Box::new(WavTurnRecorder::new(
                stream.clone(),
                self.config.microphone_wav.clone(),
            )),
            CaptureProfile::Camera => Box::new(ClipRecorder::new(
                stream.clone(),
                profile,
                self.config.camera_clip.clone(),
            )),
            CaptureProfile::Screen => Box::new(ClipRecorder::new(
                stream.clone(),
                profile,
                self.config.screen_clip.clone(),
            )),
        }
    }
}

/// Records a turn by replaying the microphone fixture for as long as the turn lasted
pub struct WavTurnRecorder {
    stream: MediaStream,
    fixture: Option<PathBuf>,
    samples: Vec<i16>,
    started_at: Option<Instant>,
}

impl WavTurnRecorder {
    pub fn new(stream: MediaStream, fixture: Option<PathBuf>) -> Self {
        Self {
            stream,
            fixture,
            samples: Vec::new(),
            started_at: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureUnit for WavTurnRecorder {
    async fn start(&mut self) -> Result<(), SessionError> {
        if !self.stream.audio_tracks().any(MediaTrack::is_live) {
            return Err(SessionError::Device("microphone track is not live".to_string()));
        }

        let path = self
            .fixture
            .clone()
            .ok_or_else(|| SessionError::Device("no microphone device present".to_string()))?;

        let target_rate = CaptureProfile::Turn.sample_rate();
        self.samples = tokio::task::spawn_blocking(move || load_fixture(&path, target_rate))
            .await
            .map_err(|e| SessionError::Device(format!("microphone task failed: {}", e)))??;
        self.started_at = Some(Instant::now());

        debug!("Turn recording started ({} fixture samples)", self.samples.len());
        Ok(())
    }

    async fn finalize(&mut self) -> Result<MediaBlob, SessionError> {
        let started_at = self
            .started_at
            .take()
            .ok_or_else(|| SessionError::Device("turn recorder was not started".to_string()))?;

        let rate = CaptureProfile::Turn.sample_rate();
        let needed = (started_at.elapsed().as_secs_f64() * rate as f64) as usize;
        let samples: Vec<i16> = self.samples.iter().copied().cycle().take(needed).collect();

        let data = encode_wav(&samples, rate, CaptureProfile::Turn.audio_channels())?;
        info!(
            "Turn recording finalized: {:.1}s, {} bytes",
            samples.len() as f64 / rate as f64,
            data.len()
        );

        Ok(MediaBlob::new(CaptureProfile::Turn.mime_type(), data))
    }

    fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    fn profile(&self) -> CaptureProfile {
        CaptureProfile::Turn
    }
}

/// Records a whole-session stream by returning a pre-recorded clip
pub struct ClipRecorder {
    stream: MediaStream,
    profile: CaptureProfile,
    clip: Option<PathBuf>,
    recording: bool,
}

impl ClipRecorder {
    pub fn new(stream: MediaStream, profile: CaptureProfile, clip: Option<PathBuf>) -> Self {
        Self {
            stream,
            profile,
            clip,
            recording: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureUnit for ClipRecorder {
    async fn start(&mut self) -> Result<(), SessionError> {
        if !self.stream.video_tracks().any(MediaTrack::is_live) {
            return Err(SessionError::Device(format!(
                "{:?} stream has no live video track",
                self.profile
            )));
        }
        if self.clip.is_none() {
            return Err(SessionError::Device(format!("no {:?} clip configured", self.profile)));
        }

        self.recording = true;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<MediaBlob, SessionError> {
        if !self.recording {
            return Err(SessionError::Device(format!(
                "{:?} recorder was not started",
                self.profile
            )));
        }
        self.recording = false;

        let path = self
            .clip
            .as_ref()
            .ok_or_else(|| SessionError::Device(format!("no {:?} clip configured", self.profile)))?;
        let data = tokio::fs::read(path).await.map_err(|e| {
            SessionError::Device(format!("failed to read {}: {}", path.display(), e))
        })?;

        Ok(MediaBlob::new(self.profile.mime_type(), data))
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn profile(&self) -> CaptureProfile {
        self.profile
    }
}

/// Load a WAV fixture as mono samples at `target_rate`
fn load_fixture(path: &Path, target_rate: u32) -> Result<Vec<i16>, SessionError> {
    let reader = hound::WavReader::open(path).map_err(|e| {
        SessionError::Device(format!("failed to open {}: {}", path.display(), e))
    })?;

    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SessionError::Device(format!("failed to read microphone samples: {}", e)))?;

    let mono = mix_to_mono(&samples, spec.channels);
    let resampled = resample(&mono, spec.sample_rate, target_rate)?;
    if resampled.is_empty() {
        return Err(SessionError::Device(format!(
            "microphone fixture is empty: {}",
            path.display()
        )));
    }

    Ok(resampled)
}

/// Average interleaved channels into one
pub fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Band-limited rate conversion of mono samples
///
/// Returns exactly `len * to_rate / from_rate` samples, aligned with the input.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Result<Vec<i16>, SessionError> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        RESAMPLE_CHUNK,
        1, // mono
    )
    .map_err(|e| SessionError::Device(format!("failed to create resampler: {}", e)))?;

    let expected = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let input: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);
    let mut pos = 0;
    while output.len() < expected + delay {
        let needed = resampler.input_frames_next();
        let mut chunk: Vec<f32> = input.get(pos..).unwrap_or(&[]).iter().take(needed).copied().collect();
        // Zero-pad the tail to flush the filter
        chunk.resize(needed, 0.0);
        pos += needed;

        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| SessionError::Device(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&resampled[0]);
    }

    Ok(output[delay..delay + expected]
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect())
}

/// Encode 16-bit PCM into an in-memory WAV file
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>, SessionError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SessionError::Device(format!("failed to create WAV writer: {}", e)))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| SessionError::Device(format!("failed to write sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| SessionError::Device(format!("failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
