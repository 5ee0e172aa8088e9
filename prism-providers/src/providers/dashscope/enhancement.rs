//! DashScope prompt enhancement provider (Qwen text generation)

use super::client::DashScopeClient;
use super::types::{Message, TextGenerationRequest, TextGenerationResponse, TextInput, TextParameters};
use crate::EnhancementProvider;
use async_trait::async_trait;
use prism_core::{PrismError, PrismResult};

pub const TEXT_GENERATION_ENDPOINT: &str = "services/aigc/text-generation/generation";
pub const DEFAULT_TEXT_MODEL: &str = "qwen-turbo";

const SYSTEM_PROMPT: &str = "You rewrite short prompts for an image and video generator used in \
K12 classrooms. Expand the prompt into one vivid, concrete visual description of the subject, \
setting, lighting, colors and composition. Keep it age-appropriate and free of violence, adult \
themes, brands and politics. The picture must not contain any written text, letters or numbers. \
Answer with the rewritten prompt only, under 250 words.";

/// Qwen-backed prompt rewriter.
#[derive(Debug, Clone)]
pub struct DashScopeEnhancementProvider {
    client: DashScopeClient,
    model: String,
}

impl DashScopeEnhancementProvider {
    pub fn new(client: DashScopeClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Create provider with the default qwen-turbo model.
    pub fn with_default_model(client: DashScopeClient) -> Self {
        Self::new(client, DEFAULT_TEXT_MODEL)
    }

    fn build_request(&self, prompt: &str) -> TextGenerationRequest {
        TextGenerationRequest {
            model: self.model.clone(),
            input: TextInput {
                messages: vec![
                    Message {
                        role: "system".to_string(),
                        content: SYSTEM_PROMPT.to_string(),
                    },
                    Message {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    },
                ],
            },
            parameters: TextParameters {
                max_tokens: 300,
                temperature: 0.7,
                top_p: 0.8,
            },
        }
    }
}

/// Pull the generated text out of either response layout.
pub(crate) fn extract_text(response: TextGenerationResponse) -> Option<String> {
    let output = response.output;
    output
        .text
        .or_else(|| output.choices.into_iter().next().map(|c| c.message.content))
        .map(|t| t.trim().trim_matches('"').trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl EnhancementProvider for DashScopeEnhancementProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn enhance(&self, prompt: &str) -> PrismResult<String> {
        let response: TextGenerationResponse = self
            .client
            .post(TEXT_GENERATION_ENDPOINT, &self.build_request(prompt))
            .await?;
        extract_text(response).ok_or_else(|| PrismError::Enhancement {
            reason: format!("{} returned no text", self.model),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_request_parameters() {
        let client = DashScopeClient::new(SecretString::from("k")).unwrap();
        let provider = DashScopeEnhancementProvider::with_default_model(client);
        let json = serde_json::to_value(provider.build_request("a cat")).unwrap();
        assert_eq!(json["model"], "qwen-turbo");
        assert_eq!(json["parameters"]["max_tokens"], 300);
        assert_eq!(json["input"]["messages"][1]["content"], "a cat");
    }

    #[test]
    fn test_extract_text_layouts() {
        let text: TextGenerationResponse =
            serde_json::from_str(r#"{"output":{"text":"  \"a bright cat\" "}}"#).unwrap();
        assert_eq!(extract_text(text).as_deref(), Some("a bright cat"));

        let choices: TextGenerationResponse = serde_json::from_str(
            r#"{"output":{"choices":[{"message":{"role":"assistant","content":"a calm lake"}}]}}"#,
        )
        .unwrap();
        assert_eq!(extract_text(choices).as_deref(), Some("a calm lake"));

        let empty: TextGenerationResponse =
            serde_json::from_str(r#"{"output":{"text":"   "}}"#).unwrap();
        assert_eq!(extract_text(empty), None);
    }
}
