//! Keyword-based intent classification
//!
//! Decides whether an automatically routed prompt should produce an image or
//! a video. Pure and deterministic: no I/O, no suspension.

use crate::MediaKind;
use serde::{Deserialize, Serialize};

pub const VIDEO_KEYWORDS: &[&str] = &[
    "video", "videos", "视频", "影片", "动画", "animation", "clip", "footage", "movie", "film",
];

pub const IMAGE_KEYWORDS: &[&str] = &[
    "image",
    "images",
    "picture",
    "pictures",
    "photo",
    "photos",
    "图片",
    "图像",
    "照片",
    "画",
    "图",
    "pic",
    "pics",
    "photograph",
    "illustration",
    "drawing",
];

pub const VIDEO_CONFIDENCE: f64 = 1.0;
pub const DEFAULT_IMAGE_CONFIDENCE: f64 = 0.95;
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.8;
pub const NO_KEYWORD_RATIONALE: &str = "No explicit media type keyword detected, defaulting to image";

/// Result of classifying a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IntentAnalysis {
    pub kind: MediaKind,
    pub confidence: f64,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    image_confidence: f64,
    fallback_confidence: f64,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self {
            image_confidence: DEFAULT_IMAGE_CONFIDENCE,
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
        }
    }
}

impl IntentClassifier {
    /// Confidences are clamped to `[0, 1]`.
    pub fn new(image_confidence: f64, fallback_confidence: f64) -> Self {
        Self {
            image_confidence: image_confidence.clamp(0.0, 1.0),
            fallback_confidence: fallback_confidence.clamp(0.0, 1.0),
        }
    }

    pub fn fallback_confidence(&self) -> f64 {
        self.fallback_confidence
    }

    /// Video keywords win over image keywords when both are present.
    pub fn classify(&self, prompt: &str) -> IntentAnalysis {
        let lowered = prompt.to_lowercase();
        let words = ascii_words(&lowered);

        if let Some(keyword) = find_keyword(&lowered, &words, VIDEO_KEYWORDS) {
            return IntentAnalysis {
                kind: MediaKind::Video,
                confidence: VIDEO_CONFIDENCE,
                rationale: format!("Explicit video keyword detected: '{}'", keyword),
                matched_keyword: Some(keyword.to_string()),
            };
        }

        if let Some(keyword) = find_keyword(&lowered, &words, IMAGE_KEYWORDS) {
            return IntentAnalysis {
                kind: MediaKind::Image,
                confidence: self.image_confidence,
                rationale: format!("Explicit image keyword detected: '{}'", keyword),
                matched_keyword: Some(keyword.to_string()),
            };
        }

        IntentAnalysis {
            kind: MediaKind::Image,
            confidence: self.fallback_confidence,
            rationale: NO_KEYWORD_RATIONALE.to_string(),
            matched_keyword: None,
        }
    }
}

/// Split on anything that is not an ASCII alphanumeric.
fn ascii_words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

// ASCII keywords must match a whole word; CJK keywords match anywhere.
fn find_keyword(
    lowered: &str,
    words: &[&str],
    keywords: &'static [&'static str],
) -> Option<&'static str> {
    keywords.iter().copied().find(|keyword| {
        if keyword.is_ascii() {
            words.contains(keyword)
        } else {
            lowered.contains(keyword)
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================
