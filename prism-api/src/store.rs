//! Local artifact storage.
//!
//! Artifacts live in two kind-segregated directories under one root:
//! `temp_images/` and `temp_videos/`. Only names produced by
//! [`artifact_filename`] are ever read, listed or deleted, so request
//! input can never address a path outside those directories.

use chrono::Utc;
use prism_core::{artifact_filename, is_artifact_filename, MediaKind, PrismError, PrismResult};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Suffix of files still being written.
pub const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

/// A listed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    pub kind: MediaKind,
    pub filename: String,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Outcome of one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: u64,
    pub removed: u64,
    pub bytes_removed: u64,
    pub errors: u64,
}

impl ArtifactStore {
    /// Open the store, creating both kind directories if needed.
    pub async fn open(root: impl Into<PathBuf>) -> PrismResult<Self> {
        let store = Self { root: root.into() };
        for kind in MediaKind::ALL {
            let dir = store.dir(kind);
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                PrismError::config(
                    "ARTIFACT_ROOT",
                    format!("cannot create {}: {}", dir.display(), e),
                )
            })?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, kind: MediaKind) -> PathBuf {
        self.root.join(kind.storage_dir())
    }

    /// Pick a fresh, unguessable filename for a new artifact.
    pub fn new_filename(&self, kind: MediaKind) -> String {
        artifact_filename(kind, Utc::now(), rand::random::<[u8; 8]>())
    }

    /// Path of an existing or future artifact. Rejects foreign names.
    pub fn path_for(&self, kind: MediaKind, filename: &str) -> PrismResult<PathBuf> {
        if !is_artifact_filename(kind, filename) {
            return Err(prism_core::ValidationError::InvalidValue {
                field: "filename".to_string(),
                reason: format!("'{}' is not a {} artifact name", filename, kind),
            }
            .into());
        }
        Ok(self.dir(kind).join(filename))
    }

    /// Write target used while a download is in progress.
    pub fn partial_path(&self, kind: MediaKind, filename: &str) -> PathBuf {
        self.dir(kind).join(format!("{}{}", filename, PARTIAL_SUFFIX))
    }

    pub async fn exists(&self, kind: MediaKind, filename: &str) -> bool {
        match self.path_for(kind, filename) {
            Ok(path) => tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Finished artifacts of one kind, newest first.
    pub async fn list(&self, kind: MediaKind) -> PrismResult<Vec<ArtifactEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(self.dir(kind))
            .await
            .map_err(|e| io_error(&self.dir(kind), e))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(&self.dir(kind), e))? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !is_artifact_filename(kind, &filename) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            entries.push(ArtifactEntry {
                kind,
                filename,
                size_bytes: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Remove one artifact. Returns false if it did not exist.
    pub async fn delete(&self, kind: MediaKind, filename: &str) -> PrismResult<bool> {
        let path = self.path_for(kind, filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(kind = %kind, filename, "artifact deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Delete artifacts and abandoned partial files last modified more than
    /// `max_age` before `now`.
    pub async fn sweep(&self, max_age: Duration, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        for kind in MediaKind::ALL {
            let dir = self.dir(kind);
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot scan artifact directory");
                    report.errors += 1;
                    continue;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "artifact scan interrupted");
                        report.errors += 1;
                        break;
                    }
                };
                let filename = entry.file_name().to_string_lossy().into_owned();
                let candidate = filename
                    .strip_suffix(PARTIAL_SUFFIX)
                    .unwrap_or(&filename);
                if !is_artifact_filename(kind, candidate) {
                    continue;
                }
                report.scanned += 1;

                let Ok(meta) = entry.metadata().await else {
                    report.errors += 1;
                    continue;
                };
                let modified = meta.modified().unwrap_or(now);
                let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
                if age <= max_age {
                    continue;
                }
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => {
                        report.removed += 1;
                        report.bytes_removed += meta.len();
                        tracing::debug!(kind = %kind, filename, age_secs = age.as_secs(), "expired artifact removed");
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(filename, error = %e, "failed to remove expired artifact");
                        report.errors += 1;
                    }
                }
            }
        }
        report
    }
}

fn io_error(path: &Path, e: io::Error) -> PrismError {
    PrismError::internal(format!("{}: {}", path.display(), e))
}
