//! API Response Types
//!
//! Payloads returned by the generation endpoints. Image and video payloads
//! share the `type` discriminator and the prompt metadata; the video payload
//! keeps the provider URL as its primary link because local copies of large
//! videos may be slow to serve.

use prism_core::{IntentAnalysis, MediaKind, RequestId};
use serde::{Deserialize, Serialize};

use crate::constants::{IMAGE_SUCCESS_MESSAGE, VIDEO_DOWNLOAD_INSTRUCTIONS};
use crate::services::GenerationOutcome;

/// Timestamp format used in payloads and artifact filenames.
const PAYLOAD_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ============================================================================
// INTENT
// ============================================================================

/// Classification result, present only for automatically routed requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IntentAnalysisBody {
    pub detected_type: MediaKind,
    pub confidence: f64,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

impl From<IntentAnalysis> for IntentAnalysisBody {
    fn from(analysis: IntentAnalysis) -> Self {
        Self {
            detected_type: analysis.kind,
            confidence: analysis.confidence,
            rationale: analysis.rationale,
            matched_keyword: analysis.matched_keyword,
        }
    }
}

// ============================================================================
// IMAGE
// ============================================================================

/// Successful image generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImagePayload {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub request_id: RequestId,
    /// Local artifact link
    pub url: String,
    pub image_url: String,
    /// `![](<image_url>)`
    pub markdown_image: String,
    pub markdown: String,
    pub filename: String,
    pub size: String,
    pub message: String,
    pub prompt_enhanced: bool,
    pub original_prompt: String,
    pub enhanced_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_prompt: Option<String>,
    /// Provider-hosted copy
    pub remote_url: String,
    pub timestamp: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_analysis: Option<IntentAnalysisBody>,
}

// ============================================================================
// VIDEO
// ============================================================================

/// Successful video generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VideoPayload {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub request_id: RequestId,
    /// Provider-hosted result
    pub url: String,
    pub video_url: String,
    /// Local artifact link
    pub local_url: String,
    pub filename: String,
    /// Download instructions for chat clients
    pub text: String,
    pub message: String,
    /// `<video>` embed of the local copy
    pub markdown: String,
    pub size: String,
    pub duration: u32,
    pub has_audio: bool,
    pub model: String,
    pub prompt_enhanced: bool,
    pub original_prompt: String,
    pub enhanced_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_prompt: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_analysis: Option<IntentAnalysisBody>,
}

// ============================================================================
// UNIFIED
// ============================================================================

/// Response of every JSON generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum GenerationPayload {
    Image(ImagePayload),
    Video(VideoPayload),
}

impl GenerationPayload {
    pub fn kind(&self) -> MediaKind {
        match self {
            GenerationPayload::Image(p) => p.kind,
            GenerationPayload::Video(p) => p.kind,
        }
    }

    /// Body of the plain-text endpoints.
    pub fn plain_text(&self) -> &str {
        match self {
            GenerationPayload::Image(p) => &p.markdown_image,
            GenerationPayload::Video(p) => &p.text,
        }
    }
}

impl From<GenerationOutcome> for GenerationPayload {
    fn from(outcome: GenerationOutcome) -> Self {
        let timestamp = outcome
            .artifact
            .created_at
            .format(PAYLOAD_TIMESTAMP_FORMAT)
            .to_string();
        let intent_analysis = outcome.intent.map(IntentAnalysisBody::from);

        match outcome.kind {
            MediaKind::Image => {
                let markdown_image = format!("![]({})", outcome.local_url);
                GenerationPayload::Image(ImagePayload {
                    success: true,
                    kind: MediaKind::Image,
                    request_id: outcome.request_id,
                    url: outcome.local_url.clone(),
                    image_url: outcome.local_url,
                    markdown: markdown_image.clone(),
                    markdown_image,
                    filename: outcome.artifact.filename,
                    size: outcome.size,
                    message: IMAGE_SUCCESS_MESSAGE.to_string(),
                    prompt_enhanced: outcome.prompt_enhanced,
                    original_prompt: outcome.original_prompt,
                    enhanced_prompt: outcome.enhanced_prompt,
                    actual_prompt: outcome.actual_prompt,
                    remote_url: outcome.remote_url,
                    timestamp,
                    model: outcome.model,
                    intent_analysis,
                })
            }
            MediaKind::Video => {
                let text = format!("{} {}", VIDEO_DOWNLOAD_INSTRUCTIONS, outcome.remote_url);
                GenerationPayload::Video(VideoPayload {
                    success: true,
                    kind: MediaKind::Video,
                    request_id: outcome.request_id,
                    url: outcome.remote_url.clone(),
                    video_url: outcome.remote_url,
                    markdown: format!("<video src=\"{}\" controls></video>", outcome.local_url),
                    local_url: outcome.local_url,
                    filename: outcome.artifact.filename,
                    message: text.clone(),
                    text,
                    size: outcome.size,
                    duration: outcome.duration.unwrap_or_default(),
                    has_audio: outcome.has_audio,
                    model: outcome.model,
                    prompt_enhanced: outcome.prompt_enhanced,
                    original_prompt: outcome.original_prompt,
                    enhanced_prompt: outcome.enhanced_prompt,
                    actual_prompt: outcome.actual_prompt,
                    timestamp,
                    intent_analysis,
                })
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use prism_core::StoredArtifact;
    use std::path::PathBuf;

    fn outcome(kind: MediaKind) -> GenerationOutcome {
        let filename = format!("generated_20250101_120000_0123456789abcdef.{}", kind.extension());
        GenerationOutcome {
            request_id: prism_core::new_request_id(),
            kind,
            task_id: "task-1".to_string(),
            remote_url: "https://cdn.example.com/result".to_string(),
            artifact: StoredArtifact {
                path: PathBuf::from(kind.storage_dir()).join(&filename),
                filename: filename.clone(),
                kind,
                task_id: "task-1".to_string(),
                created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
                size_bytes: 42,
            },
            local_url: format!("http://localhost:9528/{}/{}", kind.storage_dir(), filename),
            original_prompt: "a sunset".to_string(),
            enhanced_prompt: None,
            prompt_enhanced: false,
            enhancement_cached: false,
            intent: None,
            size: "1920*1080".to_string(),
            duration: (kind == MediaKind::Video).then_some(10),
            model: "wan2.5-t2v-preview".to_string(),
            has_audio: kind == MediaKind::Video,
            actual_prompt: None,
            polls: 2,
        }
    }

    #[test]
    fn test_image_payload_embeds_local_url() {
        let payload = GenerationPayload::from(outcome(MediaKind::Image));
        let GenerationPayload::Image(image) = &payload else {
            panic!("expected image payload");
        };
        assert_eq!(image.url, image.image_url);
        assert_eq!(image.markdown_image, format!("![]({})", image.image_url));
        assert_eq!(image.timestamp, "20250101_120000");
        assert_eq!(payload.plain_text(), image.markdown_image);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["success"], true);
        assert!(json.get("intent_analysis").is_none());
    }

    #[test]
    fn test_video_payload_keeps_remote_url_primary() {
        let payload = GenerationPayload::from(outcome(MediaKind::Video));
        let GenerationPayload::Video(video) = &payload else {
            panic!("expected video payload");
        };
        assert_eq!(video.url, "https://cdn.example.com/result");
        assert_eq!(
            video.text,
            "Please copy the link to your web browser to download the video, video URL: https://cdn.example.com/result"
        );
        assert_eq!(video.message, video.text);
        assert!(video.markdown.starts_with("<video src=\"http://localhost:9528/temp_videos/"));
        assert_eq!(video.duration, 10);
        assert!(video.has_audio);
    }

    #[test]
    fn test_intent_block_serialized_when_classified() {
        let mut auto = outcome(MediaKind::Image);
        auto.intent = Some(IntentAnalysis {
            kind: MediaKind::Image,
            confidence: 0.8,
            rationale: "No explicit media type keyword detected, defaulting to image".to_string(),
            matched_keyword: None,
        });
        let json = serde_json::to_value(GenerationPayload::from(auto)).unwrap();
        assert_eq!(json["intent_analysis"]["detected_type"], "image");
        assert_eq!(json["intent_analysis"]["confidence"], 0.8);
    }
}
