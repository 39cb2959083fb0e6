use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::audio::HeadlessPlayer;
use crate::capture::{ReplayConfig, ReplayDevices};
use crate::channel::WsConnector;
use crate::session::{Collaborators, SessionConfig};
use crate::upload::{ArchivingSink, HttpUploader, UploadEndpoints, UploadSink};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub session: SessionSettings,
    pub devices: ReplayConfig,
    pub recordings: RecordingsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-session".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

/// The interview backend
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Voice WebSocket path
    pub voice_path: String,
    #[serde(flatten)]
    pub uploads: UploadEndpoints,
    /// Cookie string the anti-forgery token is read from
    pub cookies: Option<String>,
    pub csrf_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            voice_path: "/ws/voice/".to_string(),
            uploads: UploadEndpoints::default(),
            cookies: None,
            csrf_cookie: "csrftoken".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid server URL: {}", self.base_url))
    }

    /// WebSocket URL of the voice channel (`http` -> `ws`, `https` -> `wss`)
    pub fn voice_url(&self) -> Result<Url> {
        let mut url = self
            .base_url()?
            .join(&self.voice_path)
            .context("Invalid voice path")?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("Cannot use {} as a WebSocket URL", url))?;

        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub countdown_secs: u64,
    pub handshake_timeout_secs: u64,
    pub end_marker: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            countdown_secs: defaults.countdown.as_secs(),
            handshake_timeout_secs: defaults.handshake_timeout.as_secs(),
            end_marker: defaults.end_marker,
        }
    }
}

impl SessionSettings {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            countdown: Duration::from_secs(self.countdown_secs),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            end_marker: self.end_marker.clone(),
            ..SessionConfig::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecordingsConfig {
    /// Keep a local copy of every uploaded recording here
    pub archive_path: Option<String>,
    /// Write decoded replies here
    pub replies_path: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if cfg.session.countdown_secs == 0 {
            anyhow::bail!("session.countdown_secs must be greater than zero");
        }

        Ok(cfg)
    }

    /// Real collaborators: WebSocket channel, HTTP uploads, replay devices, headless playback
    pub fn collaborators(&self) -> Result<Collaborators> {
        let connector = WsConnector::new(self.server.voice_url()?.to_string());

        let mut uploader = HttpUploader::new(self.server.base_url()?, self.server.uploads.clone())
            .with_csrf_cookie(self.server.csrf_cookie.clone());
        if let Some(cookies) = &self.server.cookies {
            uploader = uploader.with_cookies(cookies.clone());
        }
        let uploader: Arc<dyn UploadSink> = match &self.recordings.archive_path {
            Some(dir) => Arc::new(ArchivingSink::new(uploader, shellexpand::tilde(dir).into_owned())),
            None => Arc::new(uploader),
        };

        let mut player = HeadlessPlayer::new();
        if let Some(dir) = &self.recordings.replies_path {
            player = player.with_replies_dir(shellexpand::tilde(dir).into_owned());
        }

        Ok(Collaborators {
            connector: Arc::new(connector),
            devices: Arc::new(ReplayDevices::new(self.devices.clone())),
            uploader,
            player: Arc::new(player),
        })
    }
}
