//! DashScope HTTP client

use super::types::ApiError;
use super::PROVIDER_NAME;
use prism_core::{PrismError, PrismResult, ProviderError};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How a request is issued to DashScope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    /// Synchronous request.
    Sync,
    /// Creates an asynchronous task; 4xx answers are submission rejections.
    AsyncSubmit,
}

/// DashScope API client.
#[derive(Clone)]
pub struct DashScopeClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl DashScopeClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: SecretString) -> PrismResult<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom base URL and per-request timeout.
    pub fn with_base_url(
        api_key: SecretString,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> PrismResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PrismError::config("http_client", e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(self.api_key.expose_secret())
            .header("Content-Type", "application/json")
    }

    /// Create an asynchronous task.
    pub async fn submit<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> PrismResult<Res> {
        let builder = self
            .authorize(self.client.post(self.url(endpoint)))
            .header("X-DashScope-Async", "enable")
            .json(body);
        self.send(builder, Call::AsyncSubmit).await
    }

    /// Synchronous POST.
    pub async fn post<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> PrismResult<Res> {
        let builder = self.authorize(self.client.post(self.url(endpoint))).json(body);
        self.send(builder, Call::Sync).await
    }

    pub async fn get<Res: DeserializeOwned>(&self, endpoint: &str) -> PrismResult<Res> {
        let builder = self.authorize(self.client.get(self.url(endpoint)));
        self.send(builder, Call::Sync).await
    }

    async fn send<Res: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        call: Call,
    ) -> PrismResult<Res> {
        let response = builder.send().await.map_err(|e| ProviderError::Unreachable {
            provider: PROVIDER_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                ProviderError::InvalidResponse {
                    provider: PROVIDER_NAME.to_string(),
                    reason: format!("Failed to parse response: {}", e),
                }
                .into()
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(status_error(status, &error_text, call).into())
    }
}

fn status_error(status: StatusCode, body: &str, call: Call) -> ProviderError {
    let parsed = serde_json::from_str::<ApiError>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|e| e.code.clone())
        .unwrap_or_else(|| status.as_u16().to_string());
    let message = parsed
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());

    let rejected = call == Call::AsyncSubmit
        && status.is_client_error()
        && status != StatusCode::TOO_MANY_REQUESTS
        && status != StatusCode::REQUEST_TIMEOUT;
    if rejected {
        ProviderError::SubmissionRejected {
            provider: PROVIDER_NAME.to_string(),
            code,
            message,
        }
    } else {
        ProviderError::RequestFailed {
            provider: PROVIDER_NAME.to_string(),
            status: status.as_u16(),
            message: format!("{}: {}", code, message),
        }
    }
}

impl std::fmt::Debug for DashScopeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashScopeClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
