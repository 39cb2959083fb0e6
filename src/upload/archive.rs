use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, warn};

use super::{RecordingKind, UploadSink};
use crate::capture::MediaBlob;
use crate::error::SessionError;

/// Keeps a local copy of every recording before handing it to the inner sink
///
/// Archiving failures are logged and never block the upload.
pub struct ArchivingSink<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: UploadSink> ArchivingSink<S> {
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    async fn save(&self, kind: RecordingKind, blob: &MediaBlob) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(format!(
            "{}_recording_{}.webm",
            kind,
            Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ")
        ));
        tokio::fs::write(&path, &blob.data).await?;

        Ok(path)
    }
}

#[async_trait::async_trait]
impl<S: UploadSink> UploadSink for ArchivingSink<S> {
    async fn upload(&self, kind: RecordingKind, blob: MediaBlob) -> Result<(), SessionError> {
        match self.save(kind, &blob).await {
            Ok(path) => info!("Archived {} recording to {}", kind, path.display()),
            Err(e) => warn!("Failed to archive {} recording: {}", kind, e),
        }

        self.inner.upload(kind, blob).await
    }
}
