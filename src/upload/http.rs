use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use super::cookie::cookie_value;
use super::{RecordingKind, UploadSink};
use crate::capture::MediaBlob;
use crate::error::SessionError;

/// Header carrying the anti-forgery token
const CSRF_HEADER: &str = "X-CSRFToken";

/// Paths of the two submission points, relative to the server base URL
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadEndpoints {
    pub screen_path: String,
    pub video_path: String,
}

impl Default for UploadEndpoints {
    fn default() -> Self {
        Self {
            screen_path: "/upload_screen/".to_string(),
            video_path: "/upload_video/".to_string(),
        }
    }
}

impl UploadEndpoints {
    pub fn path(&self, kind: RecordingKind) -> &str {
        match kind {
            RecordingKind::Screen => &self.screen_path,
            RecordingKind::Video => &self.video_path,
        }
    }
}

/// Submits recordings as multipart form posts
pub struct HttpUploader {
    client: reqwest::Client,
    base_url: Url,
    endpoints: UploadEndpoints,
    cookies: Option<String>,
    csrf_cookie: String,
}

impl HttpUploader {
    pub fn new(base_url: Url, endpoints: UploadEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            endpoints,
            cookies: None,
            csrf_cookie: "csrftoken".to_string(),
        }
    }

    /// Cookie string the CSRF token is read from
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn with_csrf_cookie(mut self, name: impl Into<String>) -> Self {
        self.csrf_cookie = name.into();
        self
    }

    pub fn endpoint(&self, kind: RecordingKind) -> Result<Url, SessionError> {
        self.base_url
            .join(self.endpoints.path(kind))
            .map_err(|e| SessionError::Upload(format!("invalid upload URL: {}", e)))
    }

    fn csrf_token(&self) -> Option<String> {
        self.cookies
            .as_deref()
            .and_then(|c| cookie_value(c, &self.csrf_cookie))
    }
}

#[async_trait::async_trait]
impl UploadSink for HttpUploader {
    async fn upload(&self, kind: RecordingKind, blob: MediaBlob) -> Result<(), SessionError> {
        let url = self.endpoint(kind)?;
        let size = blob.len();

        let part = Part::bytes(blob.data)
            .file_name(kind.file_name())
            .mime_str(&blob.mime_type)?;
        let form = Form::new().part(kind.as_str(), part);

        let mut request = self.client.post(url.clone()).multipart(form);
        if let Some(token) = self.csrf_token() {
            request = request.header(CSRF_HEADER, token);
        }

        info!("Uploading {} recording ({} bytes) to {}", kind, size, url);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Upload of {} rejected ({}): {}", kind, status, body);
            return Err(SessionError::Upload(format!("server returned {}: {}", status, body)));
        }

        // The body is only checked for being JSON
        response.json::<serde_json::Value>().await?;

        info!("{} uploaded successfully", kind);
        Ok(())
    }
}
