//! Streams finished provider results into the artifact store.

use crate::store::ArtifactStore;
use crate::telemetry::METRICS;
use chrono::Utc;
use futures_util::StreamExt;
use prism_core::{DownloadError, MediaKind, PrismError, PrismResult, StoredArtifact};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Connect timeout for result downloads; the overall deadline is per call.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Removes a partially written file unless disarmed.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!(path = %self.path.display(), "partial download removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial download")
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: reqwest::Client,
    store: Arc<ArtifactStore>,
}

impl ArtifactFetcher {
    pub fn new(store: Arc<ArtifactStore>) -> PrismResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PrismError::config("download_client", e.to_string()))?;
        Ok(Self { client, store })
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Download `remote_url` into the store within `deadline`.
    ///
    /// On any failure, including the deadline and cancellation of the
    /// returned future, no file is left behind.
    pub async fn fetch(
        &self,
        remote_url: &str,
        kind: MediaKind,
        task_id: &str,
        deadline: Duration,
    ) -> PrismResult<StoredArtifact> {
        let filename = self.store.new_filename(kind);
        match tokio::time::timeout(deadline, self.download(remote_url, kind, &filename)).await {
            Ok(Ok(size_bytes)) => {
                if let Ok(metrics) = METRICS.as_ref() {
                    metrics.record_download(kind.as_str(), size_bytes);
                }
                tracing::info!(kind = %kind, task_id, filename = %filename, size_bytes, "artifact stored");
                Ok(StoredArtifact {
                    path: self.store.path_for(kind, &filename)?,
                    filename,
                    kind,
                    task_id: task_id.to_string(),
                    created_at: Utc::now(),
                    size_bytes,
                })
            }
            Ok(Err(source)) => {
                tracing::warn!(kind = %kind, task_id, remote_url, error = %source, "artifact download failed");
                Err(PrismError::Download {
                    remote_url: remote_url.to_string(),
                    source,
                })
            }
            Err(_) => {
                tracing::warn!(
                    kind = %kind,
                    task_id,
                    remote_url,
                    deadline_secs = deadline.as_secs_f64(),
                    "artifact download timed out"
                );
                Err(PrismError::download_timeout(deadline, remote_url))
            }
        }
    }

    async fn download(
        &self,
        remote_url: &str,
        kind: MediaKind,
        filename: &str,
    ) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(remote_url)
            .send()
            .await
            .map_err(|e| DownloadError::Network {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(DownloadError::RemoteStatus {
                status: response.status().as_u16(),
            });
        }

        let partial_path = self.store.partial_path(kind, filename);
        let final_path = self
            .store
            .path_for(kind, filename)
            .map_err(|e| io_error(filename, e))?;

        let mut file = tokio::fs::File::create(&partial_path)
            .await
            .map_err(|e| io_error(&partial_path.display().to_string(), e))?;
        let guard = PartialFile::new(partial_path.clone());

        let mut written = 0u64;
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Network {
                reason: e.to_string(),
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| io_error(&partial_path.display().to_string(), e))?;
            written += chunk.len() as u64;
        }
        if written == 0 {
            return Err(DownloadError::EmptyBody);
        }
        file.flush()
            .await
            .map_err(|e| io_error(&partial_path.display().to_string(), e))?;
        drop(file);

        tokio::fs::rename(&partial_path, &final_path)
            .await
            .map_err(|e| io_error(&final_path.display().to_string(), e))?;
        guard.disarm();
        Ok(written)
    }
}

fn io_error(path: &str, e: impl std::fmt::Display) -> DownloadError {
    DownloadError::Io {
        path: path.to_string(),
        reason: e.to_string(),
    }
}
