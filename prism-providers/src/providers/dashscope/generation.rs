//! DashScope image and video synthesis provider

use super::client::DashScopeClient;
use super::types::{SynthesisInput, SynthesisParameters, SynthesisRequest, TaskOutput, TaskResponse};
use super::PROVIDER_NAME;
use crate::{GenerationProvider, JobSpec, PollSnapshot, RemoteStatus, SubmittedTask};
use async_trait::async_trait;
use prism_core::{MediaKind, PrismResult};
use tracing::debug;

pub const IMAGE_SYNTHESIS_ENDPOINT: &str = "services/aigc/text2image/image-synthesis";
pub const VIDEO_SYNTHESIS_ENDPOINT: &str = "services/aigc/video-generation/video-synthesis";
pub const DEFAULT_IMAGE_MODEL: &str = "wan2.5-t2i-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "wan2.5-t2v-preview";

/// Wan text-to-image and text-to-video through DashScope async tasks.
#[derive(Debug, Clone)]
pub struct DashScopeGenerationProvider {
    client: DashScopeClient,
    image_model: String,
    video_model: String,
}

impl DashScopeGenerationProvider {
    pub fn new(
        client: DashScopeClient,
        image_model: impl Into<String>,
        video_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            image_model: image_model.into(),
            video_model: video_model.into(),
        }
    }

    pub fn with_default_models(client: DashScopeClient) -> Self {
        Self::new(client, DEFAULT_IMAGE_MODEL, DEFAULT_VIDEO_MODEL)
    }

    fn build_request(&self, spec: &JobSpec) -> SynthesisRequest {
        let (n, duration, audio) = match spec.kind {
            MediaKind::Image => (Some(1), None, None),
            MediaKind::Video => (None, spec.duration, spec.audio),
        };
        SynthesisRequest {
            model: self.model(spec.kind).to_string(),
            input: SynthesisInput {
                prompt: spec.prompt.clone(),
                negative_prompt: spec.negative_prompt.clone(),
            },
            parameters: SynthesisParameters {
                size: spec.size.clone(),
                n,
                duration,
                prompt_extend: spec.prompt_extend,
                watermark: spec.watermark,
                audio,
                seed: spec.seed,
            },
        }
    }
}

/// Map a task query onto a snapshot. Image results live in
/// `output.results[0]`, video results in `output.video_url`.
pub(crate) fn snapshot_from_output(kind: MediaKind, output: TaskOutput) -> PollSnapshot {
    let status = RemoteStatus::parse(&output.task_status);
    let (result_url, actual_prompt, code, message) = match kind {
        MediaKind::Image => {
            let first = output.results.into_iter().find(|r| r.url.is_some());
            match first {
                Some(r) => (r.url, r.actual_prompt.or(output.actual_prompt), r.code, r.message),
                None => (None, output.actual_prompt, None, None),
            }
        }
        MediaKind::Video => (output.video_url, output.actual_prompt, None, None),
    };
    PollSnapshot {
        task_id: output.task_id,
        status: Some(status),
        result_url,
        actual_prompt,
        error_code: output.code.or(code),
        error_message: output.message.or(message),
    }
}

#[async_trait]
impl GenerationProvider for DashScopeGenerationProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image_model,
            MediaKind::Video => &self.video_model,
        }
    }

    async fn submit(&self, spec: &JobSpec) -> PrismResult<SubmittedTask> {
        let endpoint = match spec.kind {
            MediaKind::Image => IMAGE_SYNTHESIS_ENDPOINT,
            MediaKind::Video => VIDEO_SYNTHESIS_ENDPOINT,
        };
        let request = self.build_request(spec);
        debug!(
            kind = %spec.kind,
            model = %request.model,
            size = %request.parameters.size,
            prompt_extend = request.parameters.prompt_extend,
            "submitting synthesis task"
        );
        let response: TaskResponse = self.client.submit(endpoint, &request).await?;
        Ok(SubmittedTask {
            task_id: response.output.task_id,
            status: RemoteStatus::parse(&response.output.task_status),
        })
    }

    async fn poll(&self, kind: MediaKind, task_id: &str) -> PrismResult<PollSnapshot> {
        let response: TaskResponse = self.client.get(&format!("tasks/{}", task_id)).await?;
        Ok(snapshot_from_output(kind, response.output))
    }

    async fn cancel(&self, task_id: &str) -> PrismResult<()> {
        let _: serde_json::Value = self
            .client
            .post(&format!("tasks/{}/cancel", task_id), &serde_json::json!({}))
            .await?;
        Ok(())
    }
}
