//! Generation requests and their validation

use crate::{MediaKind, SizePolicy, SizeSource, TargetKind, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_PROMPT_CHARS: usize = 3;
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 1000;

/// Inbound generation request. Built once by the HTTP layer, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub target: TargetKind,
    pub size: Option<String>,
    pub negative_prompt: Option<String>,
    /// Seconds, video only.
    pub duration: Option<u32>,
    pub watermark: Option<bool>,
    /// Local prompt enhancement. `Some(false)` opts out.
    pub enhance: Option<bool>,
    /// Provider-side prompt extension.
    pub prompt_extend: Option<bool>,
    pub seed: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, target: TargetKind) -> Self {
        Self {
            prompt: prompt.into(),
            target,
            ..Default::default()
        }
    }

    /// Check bounds and enumerations before any provider call is made.
    pub fn validate(
        &self,
        bounds: &PromptBounds,
        policy: &SizePolicy,
    ) -> Result<ValidatedRequest, ValidationError> {
        bounds.check(&self.prompt)?;

        let negative_prompt = self
            .negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if let Some(negative) = &negative_prompt {
            let chars = negative.chars().count();
            if chars > bounds.max_chars {
                return Err(ValidationError::InvalidValue {
                    field: "negative_prompt".to_string(),
                    reason: format!("{} characters exceeds maximum of {}", chars, bounds.max_chars),
                });
            }
        }

        // Out-of-range sizes are rejected for every kind, so checking against
        // one kind is enough when the target is still undecided.
        let check_kind = self.target.forced().unwrap_or(MediaKind::Image);
        policy.resolve_size(check_kind, self.size.as_deref())?;

        let duration = match self.target {
            TargetKind::Image => None,
            TargetKind::Video | TargetKind::Auto => match self.duration {
                Some(d) => Some(policy.resolve_duration(Some(d))?),
                None => None,
            },
        };

        Ok(ValidatedRequest {
            prompt: self.prompt.trim().to_string(),
            target: self.target,
            size: self.size.clone(),
            negative_prompt,
            duration,
            watermark: self.watermark,
            enhance: self.enhance,
            prompt_extend: self.prompt_extend,
            seed: self.seed,
        })
    }
}

/// Prompt length bounds in Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBounds {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for PromptBounds {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_PROMPT_CHARS,
            max_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }
}

impl PromptBounds {
    /// Minimum applies to the trimmed prompt, maximum to the raw prompt.
    pub fn check(&self, prompt: &str) -> Result<(), ValidationError> {
        let trimmed = prompt.trim().chars().count();
        if trimmed < self.min_chars {
            return Err(ValidationError::PromptTooShort {
                min: self.min_chars,
                actual: trimmed,
            });
        }
        let raw = prompt.chars().count();
        if raw > self.max_chars {
            return Err(ValidationError::PromptTooLong {
                max: self.max_chars,
                actual: raw,
            });
        }
        Ok(())
    }
}

/// A request that passed validation. Media kind may still be undecided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub prompt: String,
    pub target: TargetKind,
    size: Option<String>,
    pub negative_prompt: Option<String>,
    duration: Option<u32>,
    pub watermark: Option<bool>,
    pub enhance: Option<bool>,
    pub prompt_extend: Option<bool>,
    pub seed: Option<u32>,
}

/// Size and duration resolved for a concrete media kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub kind: MediaKind,
    pub size: String,
    pub size_source: SizeSource,
    /// Seconds; `None` for images.
    pub duration: Option<u32>,
}

impl ValidatedRequest {
    /// The size token as the caller sent it.
    pub fn requested_size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    /// Resolve size and duration once the media kind is known.
    pub fn resolve(
        &self,
        kind: MediaKind,
        policy: &SizePolicy,
    ) -> Result<ResolvedMedia, ValidationError> {
        let resolution = policy.resolve_size(kind, self.size.as_deref())?;
        let duration = match kind {
            MediaKind::Image => None,
            MediaKind::Video => Some(policy.resolve_duration(self.duration)?),
        };
        Ok(ResolvedMedia {
            kind,
            size: resolution.size,
            size_source: resolution.source,
            duration,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn validate(req: &GenerationRequest) -> Result<ValidatedRequest, ValidationError> {
        req.validate(&PromptBounds::default(), &SizePolicy::default())
    }

    #[test]
    fn test_trimmed_prompt_too_short() {
        let req = GenerationRequest::new("  ab   ", TargetKind::Auto);
        assert_eq!(
            validate(&req),
            Err(ValidationError::PromptTooShort { min: 3, actual: 2 })
        );
    }

    #[test]
    fn test_bounds_count_chars_not_bytes() {
        // three CJK characters are nine bytes
        let req = GenerationRequest::new("小猫咪", TargetKind::Image);
        assert!(validate(&req).is_ok());

        let bounds = PromptBounds { min_chars: 1, max_chars: 4 };
        assert!(bounds.check("小猫咪在").is_ok());
        assert!(matches!(
            bounds.check("小猫咪在跑"),
            Err(ValidationError::PromptTooLong { max: 4, actual: 5 })
        ));
    }

    #[test]
    fn test_max_applies_to_raw_prompt() {
        let bounds = PromptBounds { min_chars: 1, max_chars: 5 };
        assert!(bounds.check("  abc ").is_err());
    }

    #[test]
    fn test_validated_prompt_is_trimmed() {
        let req = GenerationRequest::new("  a red fox  ", TargetKind::Image);
        assert_eq!(validate(&req).unwrap().prompt, "a red fox");
    }

    #[test]
    fn test_invalid_duration_rejected_for_video_and_auto() {
        let mut req = GenerationRequest::new("a red fox", TargetKind::Video);
        req.duration = Some(7);
        assert!(matches!(
            validate(&req),
            Err(ValidationError::UnsupportedDuration { duration: 7, .. })
        ));
        req.target = TargetKind::Auto;
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_duration_ignored_for_image() {
        let mut req = GenerationRequest::new("a red fox", TargetKind::Image);
        req.duration = Some(7);
        let validated = validate(&req).unwrap();
        let resolved = validated.resolve(MediaKind::Image, &SizePolicy::default()).unwrap();
        assert_eq!(resolved.duration, None);
    }

    #[test]
    fn test_out_of_range_size_rejected_before_classification() {
        let mut req = GenerationRequest::new("a red fox", TargetKind::Auto);
        req.size = Some("5000*5000".to_string());
        assert!(matches!(
            validate(&req),
            Err(ValidationError::UnsupportedSize { .. })
        ));
    }

    #[test]
    fn test_resolve_per_kind() {
        let mut req = GenerationRequest::new("a red fox", TargetKind::Auto);
        req.size = Some("1328*1328".to_string());
        let validated = validate(&req).unwrap();
        let policy = SizePolicy::default();

        let image = validated.resolve(MediaKind::Image, &policy).unwrap();
        assert_eq!(image.size, "1280*1280");
        let video = validated.resolve(MediaKind::Video, &policy).unwrap();
        assert_eq!(video.size, "1920*1080");
        assert_eq!(video.duration, Some(10));
    }

    #[test]
    fn test_unparseable_size_keeps_requested_token() {
        let mut req = GenerationRequest::new("a red fox", TargetKind::Auto);
        req.size = Some("huge".to_string());
        let validated = validate(&req).unwrap();
        assert_eq!(validated.requested_size(), Some("huge"));

        let image = validated.resolve(MediaKind::Image, &SizePolicy::default()).unwrap();
        assert_eq!(image.size_source, SizeSource::Unparseable);
        assert_eq!(image.size, "1280*960");
    }

    #[test]
    fn test_blank_negative_prompt_dropped() {
        let mut req = GenerationRequest::new("a red fox", TargetKind::Image);
        req.negative_prompt = Some("   ".to_string());
        assert_eq!(validate(&req).unwrap().negative_prompt, None);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: GenerationRequest = serde_json::from_str(r#"{"prompt":"a red fox"}"#).unwrap();
        assert_eq!(req.target, TargetKind::Auto);
        assert_eq!(req.size, None);
    }

    proptest! {
        #[test]
        fn prop_short_prompts_always_rejected(prompt in "[a-z]{0,2}", pad in " {0,5}") {
            let req = GenerationRequest::new(format!("{}{}{}", pad, prompt, pad), TargetKind::Auto);
            let is_too_short = matches!(validate(&req), Err(ValidationError::PromptTooShort { .. }));
            prop_assert!(is_too_short);
        }

        #[test]
        fn prop_in_bounds_prompts_accepted(prompt in "[a-z一-龥]{3,200}") {
            let req = GenerationRequest::new(prompt, TargetKind::Image);
            prop_assert!(validate(&req).is_ok());
        }
    }
}
