//! Generation Service
//!
//! Drives one request through validation, optional prompt enhancement,
//! intent classification, the generation job and the artifact download.
//! Each admission slot is held only for the phase it bounds.

use prism_core::{
    GenerationRequest, IntentAnalysis, IntentClassifier, MediaKind, PrismError, PrismResult,
    PromptBounds, RequestId, ResolvedMedia, SizePolicy, SizeSource, StoredArtifact,
    ValidatedRequest,
};
use prism_providers::{
    EnhancementCache, EnhancementProvider, GenerationProvider, JobSpec, TaskClient, TaskOutcome,
};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::admission::{AdmissionController, SlotKind};
use crate::config::ServiceConfig;
use crate::fetcher::ArtifactFetcher;
use crate::telemetry::METRICS;

/// Everything a handler needs to build a response.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub request_id: RequestId,
    pub kind: MediaKind,
    pub task_id: String,
    /// Provider-hosted result, valid for the provider's retention window.
    pub remote_url: String,
    pub artifact: StoredArtifact,
    /// Public link to the stored artifact.
    pub local_url: String,
    pub original_prompt: String,
    pub enhanced_prompt: Option<String>,
    pub prompt_enhanced: bool,
    pub enhancement_cached: bool,
    /// Present only when the request was routed automatically.
    pub intent: Option<IntentAnalysis>,
    pub size: String,
    pub duration: Option<u32>,
    pub model: String,
    pub has_audio: bool,
    /// Prompt the provider actually used after its own extension.
    pub actual_prompt: Option<String>,
    pub polls: u32,
}

/// Prompt handed to the provider after the enhancement stage.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EnhancedPrompt {
    prompt: String,
    enhanced: bool,
    cached: bool,
}

/// Request orchestrator. Constructed once at startup and shared.
pub struct GenerationService {
    config: Arc<ServiceConfig>,
    policy: SizePolicy,
    bounds: PromptBounds,
    classifier: IntentClassifier,
    enhancer: Option<Arc<dyn EnhancementProvider>>,
    cache: Arc<EnhancementCache>,
    tasks: TaskClient,
    admission: Arc<AdmissionController>,
    fetcher: ArtifactFetcher,
}

impl GenerationService {
    pub fn new(
        config: Arc<ServiceConfig>,
        generator: Arc<dyn GenerationProvider>,
        enhancer: Option<Arc<dyn EnhancementProvider>>,
        cache: Arc<EnhancementCache>,
        admission: Arc<AdmissionController>,
        fetcher: ArtifactFetcher,
    ) -> PrismResult<Self> {
        Ok(Self {
            policy: config.size_policy()?,
            bounds: config.prompt_bounds(),
            classifier: IntentClassifier::new(
                config.intent_image_confidence,
                config.intent_fallback_confidence,
            ),
            tasks: TaskClient::new(generator, config.task_client_config()),
            config,
            enhancer,
            cache,
            admission,
            fetcher,
        })
    }

    pub fn config(&self) -> &Arc<ServiceConfig> {
        &self.config
    }

    pub fn cache(&self) -> &Arc<EnhancementCache> {
        &self.cache
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn size_policy(&self) -> &SizePolicy {
        &self.policy
    }

    /// Run one request to completion.
    ///
    /// Dropping the returned future abandons polling and any in-progress
    /// download; held slots and partial files are released either way.
    pub async fn generate(
        &self,
        request_id: RequestId,
        request: GenerationRequest,
    ) -> PrismResult<GenerationOutcome> {
        let span = info_span!(
            "generate",
            request_id = %request_id,
            target_kind = request.target.as_str(),
        );
        self.run(request_id, request).instrument(span).await
    }

    async fn run(
        &self,
        request_id: RequestId,
        request: GenerationRequest,
    ) -> PrismResult<GenerationOutcome> {
        debug!(phase = "validating", "orchestrator phase");
        let validated = request.validate(&self.bounds, &self.policy)?;

        let enhancement = self.enhance(&validated).await;

        let (kind, intent) = match validated.target.forced() {
            Some(kind) => (kind, None),
            None => {
                debug!(phase = "classifying", "orchestrator phase");
                let analysis = self.classifier.classify(&validated.prompt);
                info!(
                    kind = %analysis.kind,
                    confidence = analysis.confidence,
                    matched_keyword = analysis.matched_keyword.as_deref(),
                    "intent classified"
                );
                (analysis.kind, Some(analysis))
            }
        };

        let media = validated.resolve(kind, &self.policy)?;
        if media.size_source == SizeSource::Unparseable {
            warn!(
                requested = validated.requested_size(),
                used = %media.size,
                "unparseable size token, using default"
            );
        }

        let spec = self.job_spec(&validated, &media, &enhancement);
        let outcome = self.run_generation(&spec).await?;
        let artifact = self.run_download(&outcome, kind).await?;

        debug!(phase = "done", task_id = %outcome.task.task_id, "orchestrator phase");
        Ok(GenerationOutcome {
            request_id,
            kind,
            task_id: outcome.task.task_id.clone(),
            local_url: self.config.public_url(&artifact.relative_url()),
            remote_url: outcome.result_url,
            artifact,
            original_prompt: validated.prompt.clone(),
            enhanced_prompt: enhancement.enhanced.then(|| enhancement.prompt.clone()),
            prompt_enhanced: enhancement.enhanced,
            enhancement_cached: enhancement.cached,
            intent,
            size: media.size,
            duration: media.duration,
            model: self.tasks.provider().model(kind).to_string(),
            has_audio: spec.audio.unwrap_or(false),
            actual_prompt: outcome.actual_prompt,
            polls: outcome.polls,
        })
    }

    /// Enhancement never fails the request; the original prompt is the fallback.
    async fn enhance(&self, request: &ValidatedRequest) -> EnhancedPrompt {
        let original = EnhancedPrompt {
            prompt: request.prompt.clone(),
            enhanced: false,
            cached: false,
        };
        if !self.config.enhancement_enabled || request.enhance == Some(false) {
            return original;
        }
        let Some(enhancer) = self.enhancer.as_deref() else {
            return original;
        };

        debug!(phase = "enhancing", model = enhancer.model_id(), "orchestrator phase");
        match self.cache.get_or_enhance(enhancer, &request.prompt).await {
            Ok(lookup) => {
                record_enhancement(if lookup.cached { "hit" } else { "miss" });
                EnhancedPrompt {
                    prompt: lookup.enhanced,
                    enhanced: true,
                    cached: lookup.cached,
                }
            }
            Err(e) => {
                record_enhancement("failed");
                warn!(error = %e, "prompt enhancement failed, using original prompt");
                original
            }
        }
    }

    fn job_spec(
        &self,
        request: &ValidatedRequest,
        media: &ResolvedMedia,
        prompt: &EnhancedPrompt,
    ) -> JobSpec {
        let kind = media.kind;
        let prompt_extend = match kind {
            // The provider must not rewrite a prompt that was already enhanced.
            MediaKind::Image if prompt.enhanced => false,
            _ => request
                .prompt_extend
                .unwrap_or_else(|| self.config.default_prompt_extend(kind)),
        };
        JobSpec {
            kind,
            prompt: prompt.prompt.clone(),
            negative_prompt: request.negative_prompt.clone(),
            size: media.size.clone(),
            duration: media.duration,
            watermark: request
                .watermark
                .unwrap_or_else(|| self.config.default_watermark(kind)),
            prompt_extend,
            audio: match kind {
                MediaKind::Image => None,
                MediaKind::Video => Some(self.config.video_audio),
            },
            seed: request.seed,
        }
    }

    async fn run_generation(&self, spec: &JobSpec) -> PrismResult<TaskOutcome> {
        let permit = self.admission.acquire(SlotKind::Generation).await?;
        debug!(
            phase = "admitted_generation",
            waited_ms = permit.waited().as_millis() as u64,
            "orchestrator phase"
        );

        debug!(phase = "generating", kind = %spec.kind, size = %spec.size, "orchestrator phase");
        let result = self
            .tasks
            .submit_and_wait(spec, self.config.poll_timing(spec.kind))
            .await;
        drop(permit);

        if let Ok(metrics) = METRICS.as_ref() {
            let elapsed = result.as_ref().ok().map(|o| o.elapsed.as_secs_f64());
            metrics.record_generation(spec.kind.as_str(), generation_outcome(&result), elapsed);
        }
        result
    }

    async fn run_download(
        &self,
        outcome: &TaskOutcome,
        kind: MediaKind,
    ) -> PrismResult<StoredArtifact> {
        let permit = self.admission.acquire(SlotKind::Download).await?;
        debug!(
            phase = "admitted_download",
            waited_ms = permit.waited().as_millis() as u64,
            "orchestrator phase"
        );

        debug!(phase = "downloading", task_id = %outcome.task.task_id, "orchestrator phase");
        let stored = self
            .fetcher
            .fetch(
                &outcome.result_url,
                kind,
                &outcome.task.task_id,
                self.config.download_timeout(kind),
            )
            .await;
        drop(permit);
        stored
    }
}

fn record_enhancement(result: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_enhancement(result);
    }
}

fn generation_outcome(result: &PrismResult<TaskOutcome>) -> &'static str {
    match result {
        Ok(_) => "succeeded",
        Err(PrismError::Timeout { .. }) => "timeout",
        Err(PrismError::Provider(_)) => "failed",
        Err(_) => "error",
    }
}

// =============================================================================
// TESTS
// =============================================================================
