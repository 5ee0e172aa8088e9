//! Locally stored generation artifacts

use crate::{MediaKind, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ARTIFACT_PREFIX: &str = "generated_";

/// Length of the random filename component in hex characters.
pub const TOKEN_HEX_LEN: usize = 16;

/// A finished artifact on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub kind: MediaKind,
    pub task_id: String,
    pub created_at: Timestamp,
    pub size_bytes: u64,
}

impl StoredArtifact {
    /// Path relative to the public root, e.g. `temp_images/generated_...jpg`.
    pub fn relative_url(&self) -> String {
        format!("{}/{}", self.kind.storage_dir(), self.filename)
    }
}

/// Build `generated_<YYYYmmdd_HHMMSS>_<token>.<ext>`.
pub fn artifact_filename(kind: MediaKind, at: Timestamp, token: [u8; 8]) -> String {
    format!(
        "{}{}_{}.{}",
        ARTIFACT_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        hex::encode(token),
        kind.extension()
    )
}

/// Whether `name` is a well-formed artifact filename for `kind`.
///
/// Rejects anything that could escape the kind directory.
pub fn is_artifact_filename(kind: MediaKind, name: &str) -> bool {
    let Some(rest) = name.strip_prefix(ARTIFACT_PREFIX) else {
        return false;
    };
    let Some(stem) = rest.strip_suffix(&format!(".{}", kind.extension())) else {
        return false;
    };
    // YYYYmmdd_HHMMSS_<hex>
    let parts: Vec<&str> = stem.split('_').collect();
    match parts.as_slice() {
        [date, time, token] => {
            date.len() == 8
                && date.bytes().all(|b| b.is_ascii_digit())
                && time.len() == 6
                && time.bytes().all(|b| b.is_ascii_digit())
                && token.len() == TOKEN_HEX_LEN
                && token.bytes().all(|b| b.is_ascii_hexdigit())
        }
        _ => false,
    }
}
