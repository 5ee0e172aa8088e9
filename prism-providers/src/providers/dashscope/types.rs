//! DashScope API request and response types

use serde::{Deserialize, Serialize};

// ============================================================================
// SYNTHESIS TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub model: String,
    pub input: SynthesisInput,
    pub parameters: SynthesisParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInput {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisParameters {
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub prompt_extend: bool,
    pub watermark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

/// Envelope returned by submissions and task queries.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    pub output: TaskOutput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub task_status: String,
    #[serde(default)]
    pub results: Vec<ImageResult>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub actual_prompt: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageResult {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub actual_prompt: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// TEXT GENERATION TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TextGenerationRequest {
    pub model: String,
    pub input: TextInput,
    pub parameters: TextParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextInput {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextParameters {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextGenerationResponse {
    pub output: TextOutput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextOutput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}
