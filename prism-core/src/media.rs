//! Media and routing kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// File extension of stored artifacts.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    /// Directory (relative to the artifact root) holding artifacts of this kind.
    pub fn storage_dir(&self) -> &'static str {
        match self {
            MediaKind::Image => "temp_images",
            MediaKind::Video => "temp_videos",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "images" | "temp_images" => Ok(MediaKind::Image),
            "video" | "videos" | "temp_videos" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

/// Routing target chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Image,
    Video,
    #[default]
    Auto,
}

impl TargetKind {
    /// The forced media kind, or `None` when classification decides.
    pub fn forced(&self) -> Option<MediaKind> {
        match self {
            TargetKind::Image => Some(MediaKind::Image),
            TargetKind::Video => Some(MediaKind::Video),
            TargetKind::Auto => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Image => "image",
            TargetKind::Video => "video",
            TargetKind::Auto => "auto",
        }
    }
}

impl From<MediaKind> for TargetKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => TargetKind::Image,
            MediaKind::Video => TargetKind::Video,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
