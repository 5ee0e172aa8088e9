//! Supported sizes and durations per media kind

use crate::{MediaKind, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest side the provider accepts.
pub const MAX_SIDE: u32 = 4096;

pub const DEFAULT_IMAGE_SIZE: &str = "1280*960";
pub const DEFAULT_VIDEO_SIZE: &str = "1920*1080";
pub const DEFAULT_VIDEO_DURATION: u32 = 10;
pub const SUPPORTED_DURATIONS: [u32; 2] = [5, 10];

const IMAGE_CATALOG: &[&str] = &[
    "1280*1280", "1200*800", "800*1200", "1280*960", "960*1280", "1280*720", "720*1280",
    "1344*576", "1024*1024",
];

const IMAGE_ALIASES: &[(&str, &str)] = &[
    ("1328*1328", "1280*1280"),
    ("1664*928", "1280*720"),
    ("928*1664", "720*1280"),
    ("1472*1140", "1280*960"),
    ("1140*1472", "960*1280"),
];

// 480P, 720P and 1080P tiers.
const VIDEO_CATALOG: &[&str] = &[
    "832*480", "480*832", "624*624", "1280*720", "720*1280", "960*960", "1088*832",
    "832*1088", "1920*1080", "1080*1920", "1440*1440", "1632*1248", "1248*1632",
];

const VIDEO_ALIASES: &[(&str, &str)] = &[
    ("1328*1328", "1920*1080"),
    ("1664*928", "1920*1080"),
    ("1472*1140", "1920*1080"),
    ("1140*1472", "1080*1920"),
    ("928*1664", "1080*1920"),
];

/// A parsed `W*H` size token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Parse `W*H` (also `WxH`). Returns `None` for anything else.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (w, h) = token
            .split_once('*')
            .or_else(|| token.split_once(['x', 'X']))?;
        Some(Self {
            width: w.trim().parse().ok()?,
            height: h.trim().parse().ok()?,
        })
    }

    pub fn aspect(&self) -> Aspect {
        let ratio = self.width as f64 / self.height as f64;
        if ratio > 1.5 {
            Aspect::Landscape
        } else if ratio < 0.7 {
            Aspect::Portrait
        } else {
            Aspect::Square
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.width, self.height)
    }
}

/// Coarse aspect class used to map off-catalog sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    Landscape,
    Portrait,
    Square,
}

/// How a requested size token was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSource {
    /// No size requested.
    Default,
    /// Requested size is in the catalog.
    Catalog,
    /// Legacy size mapped to its catalog equivalent.
    Alias,
    /// Off-catalog size mapped to the nearest aspect class.
    AspectFallback,
    /// Token could not be parsed; the default was used.
    Unparseable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeResolution {
    pub size: String,
    pub source: SizeSource,
}

#[derive(Debug, Clone)]
struct KindSizes {
    catalog: &'static [&'static str],
    aliases: &'static [(&'static str, &'static str)],
    default: String,
    landscape: &'static str,
    portrait: &'static str,
    square: &'static str,
}

impl KindSizes {
    fn contains(&self, size: &str) -> bool {
        self.catalog.contains(&size)
    }

    fn alias(&self, size: &str) -> Option<&'static str> {
        self.aliases
            .iter()
            .find(|(from, _)| *from == size)
            .map(|(_, to)| *to)
    }

    fn for_aspect(&self, aspect: Aspect) -> &'static str {
        match aspect {
            Aspect::Landscape => self.landscape,
            Aspect::Portrait => self.portrait,
            Aspect::Square => self.square,
        }
    }
}

/// Per-kind size catalog, aliases and defaults, plus the video duration policy.
#[derive(Debug, Clone)]
pub struct SizePolicy {
    image: KindSizes,
    video: KindSizes,
    default_duration: u32,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            image: KindSizes {
                catalog: IMAGE_CATALOG,
                aliases: IMAGE_ALIASES,
                default: DEFAULT_IMAGE_SIZE.to_string(),
                landscape: "1280*720",
                portrait: "720*1280",
                square: "1024*1024",
            },
            video: KindSizes {
                catalog: VIDEO_CATALOG,
                aliases: VIDEO_ALIASES,
                default: DEFAULT_VIDEO_SIZE.to_string(),
                landscape: "1920*1080",
                portrait: "1080*1920",
                square: "1440*1440",
            },
            default_duration: DEFAULT_VIDEO_DURATION,
        }
    }
}

impl SizePolicy {
    /// Build a policy with custom defaults. Defaults must be catalog sizes.
    pub fn new(
        image_default: &str,
        video_default: &str,
        default_duration: u32,
    ) -> Result<Self, ValidationError> {
        let mut policy = Self::default();
        for (kind, size) in [
            (MediaKind::Image, image_default),
            (MediaKind::Video, video_default),
        ] {
            if !policy.supports(kind, size) {
                return Err(ValidationError::UnsupportedSize {
                    kind,
                    size: size.to_string(),
                    reason: "default size must be one of the supported sizes".to_string(),
                });
            }
        }
        if !SUPPORTED_DURATIONS.contains(&default_duration) {
            return Err(ValidationError::UnsupportedDuration {
                duration: default_duration,
                allowed: SUPPORTED_DURATIONS.to_vec(),
            });
        }
        policy.image.default = image_default.to_string();
        policy.video.default = video_default.to_string();
        policy.default_duration = default_duration;
        Ok(policy)
    }

    fn sizes(&self, kind: MediaKind) -> &KindSizes {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Video => &self.video,
        }
    }

    pub fn default_size(&self, kind: MediaKind) -> &str {
        &self.sizes(kind).default
    }

    pub fn default_duration(&self) -> u32 {
        self.default_duration
    }

    pub fn supports(&self, kind: MediaKind, size: &str) -> bool {
        self.sizes(kind).contains(size)
    }

    pub fn catalog(&self, kind: MediaKind) -> &'static [&'static str] {
        self.sizes(kind).catalog
    }

    /// Resolve a requested size token to a size the provider accepts.
    pub fn resolve_size(
        &self,
        kind: MediaKind,
        requested: Option<&str>,
    ) -> Result<SizeResolution, ValidationError> {
        let sizes = self.sizes(kind);
        let token = match requested.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                return Ok(SizeResolution {
                    size: sizes.default.clone(),
                    source: SizeSource::Default,
                })
            }
        };

        let Some(dims) = Dimensions::parse(token) else {
            return Ok(SizeResolution {
                size: sizes.default.clone(),
                source: SizeSource::Unparseable,
            });
        };

        if dims.width == 0 || dims.height == 0 || dims.width > MAX_SIDE || dims.height > MAX_SIDE
        {
            return Err(ValidationError::UnsupportedSize {
                kind,
                size: token.to_string(),
                reason: format!("each side must be between 1 and {}", MAX_SIDE),
            });
        }

        let canonical = dims.to_string();
        if sizes.contains(&canonical) {
            return Ok(SizeResolution {
                size: canonical,
                source: SizeSource::Catalog,
            });
        }
        if let Some(mapped) = sizes.alias(&canonical) {
            return Ok(SizeResolution {
                size: mapped.to_string(),
                source: SizeSource::Alias,
            });
        }
        Ok(SizeResolution {
            size: sizes.for_aspect(dims.aspect()).to_string(),
            source: SizeSource::AspectFallback,
        })
    }

    /// Resolve the video duration in seconds.
    pub fn resolve_duration(&self, requested: Option<u32>) -> Result<u32, ValidationError> {
        match requested {
            None => Ok(self.default_duration),
            Some(d) if SUPPORTED_DURATIONS.contains(&d) => Ok(d),
            Some(d) => Err(ValidationError::UnsupportedDuration {
                duration: d,
                allowed: SUPPORTED_DURATIONS.to_vec(),
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_size_uses_default() {
        let policy = SizePolicy::default();
        let res = policy.resolve_size(MediaKind::Image, None).unwrap();
        assert_eq!(res.size, "1280*960");
        assert_eq!(res.source, SizeSource::Default);

        let res = policy.resolve_size(MediaKind::Video, Some("  ")).unwrap();
        assert_eq!(res.size, "1920*1080");
    }

    #[test]
    fn test_catalog_and_alias() {
        let policy = SizePolicy::default();
        let res = policy.resolve_size(MediaKind::Image, Some("1024*1024")).unwrap();
        assert_eq!(res, SizeResolution { size: "1024*1024".into(), source: SizeSource::Catalog });

        let res = policy.resolve_size(MediaKind::Image, Some("1328*1328")).unwrap();
        assert_eq!(res.size, "1280*1280");
        assert_eq!(res.source, SizeSource::Alias);

        let res = policy.resolve_size(MediaKind::Video, Some("928*1664")).unwrap();
        assert_eq!(res.size, "1080*1920");
    }

    #[test]
    fn test_x_separator_is_accepted() {
        let policy = SizePolicy::default();
        let res = policy.resolve_size(MediaKind::Video, Some("1280x720")).unwrap();
        assert_eq!(res.size, "1280*720");
        assert_eq!(res.source, SizeSource::Catalog);
    }

    #[test]
    fn test_aspect_fallback() {
        let policy = SizePolicy::default();
        let wide = policy.resolve_size(MediaKind::Image, Some("2000*1000")).unwrap();
        assert_eq!(wide.size, "1280*720");
        assert_eq!(wide.source, SizeSource::AspectFallback);

        let tall = policy.resolve_size(MediaKind::Video, Some("500*1000")).unwrap();
        assert_eq!(tall.size, "1080*1920");

        let square = policy.resolve_size(MediaKind::Video, Some("1000*900")).unwrap();
        assert_eq!(square.size, "1440*1440");
    }

    #[test]
    fn test_unparseable_falls_back_to_default() {
        let policy = SizePolicy::default();
        let res = policy.resolve_size(MediaKind::Image, Some("huge")).unwrap();
        assert_eq!(res.size, "1280*960");
        assert_eq!(res.source, SizeSource::Unparseable);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let policy = SizePolicy::default();
        assert!(matches!(
            policy.resolve_size(MediaKind::Image, Some("0*720")),
            Err(ValidationError::UnsupportedSize { .. })
        ));
        assert!(matches!(
            policy.resolve_size(MediaKind::Video, Some("8192*4096")),
            Err(ValidationError::UnsupportedSize { .. })
        ));
    }

    #[test]
    fn test_durations() {
        let policy = SizePolicy::default();
        assert_eq!(policy.resolve_duration(None).unwrap(), 10);
        assert_eq!(policy.resolve_duration(Some(5)).unwrap(), 5);
        assert!(matches!(
            policy.resolve_duration(Some(7)),
            Err(ValidationError::UnsupportedDuration { duration: 7, .. })
        ));
    }

    #[test]
    fn test_custom_defaults_must_be_supported() {
        let policy = SizePolicy::new("1024*1024", "1280*720", 5).unwrap();
        assert_eq!(policy.default_size(MediaKind::Image), "1024*1024");
        assert_eq!(policy.default_duration(), 5);

        assert!(SizePolicy::new("1920*1080", "1280*720", 5).is_err());
        assert!(SizePolicy::new("1024*1024", "1280*720", 6).is_err());
    }

    #[test]
    fn test_aspect_classes() {
        assert_eq!(Dimensions::parse("1920*1080").unwrap().aspect(), Aspect::Landscape);
        assert_eq!(Dimensions::parse("1200*800").unwrap().aspect(), Aspect::Square);
        assert_eq!(Dimensions::parse("720*1280").unwrap().aspect(), Aspect::Portrait);
        assert_eq!(Dimensions::parse("1*2*3"), None);
    }
}
