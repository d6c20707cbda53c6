use std::time::Duration;

use async_trait::async_trait;
use nomina_core::config::LlmConfig;
use nomina_tool_runtime::{CompletionProvider, CompletionRequest, LlmError, Message, ModelInfo};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::retry::{with_retry, RetryPolicy};
use crate::translate::{parse_chat_response, parse_models_response, ChatRequest};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Client for an OpenAI-compatible chat completions endpoint (OpenRouter by
/// default) with tool calling.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    site_url: Option<String>,
    site_name: Option<String>,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::NotConfigured(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            site_url: None,
            site_name: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Build from the `llm` configuration section. Requires an API key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::NotConfigured("OPENROUTER_API_KEY is not set".into()))?;
        let client = Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?
        .with_site(config.site_url.clone(), config.site_name.clone())
        .with_retry_policy(RetryPolicy::default().with_max_retries(config.max_retries));
        Ok(client)
    }

    /// Attribution headers (`HTTP-Referer`, `X-Title`). Empty values are skipped.
    pub fn with_site(mut self, site_url: Option<String>, site_name: Option<String>) -> Self {
        self.site_url = site_url.filter(|s| !s.is_empty());
        self.site_name = site_name.filter(|s| !s.is_empty());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder.bearer_auth(&self.api_key);
        if let Some(url) = &self.site_url {
            builder = builder.header("HTTP-Referer", url);
        }
        if let Some(name) = &self.site_name {
            builder = builder.header("X-Title", name);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, LlmError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;
        let response = check_status(response).await?;
        response
            .text()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))
    }
}

/// Map a non-success status to the matching [`LlmError`].
async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthError(body),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after_secs },
        _ => LlmError::ApiError {
            status: status.as_u16(),
            message: body,
        },
    })
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Message, LlmError> {
        let url = self.endpoint("chat/completions");
        let body = ChatRequest::from_request(&request);

        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "completion request"
        );

        let text = with_retry(&self.retry, "chat completion", || {
            self.send(self.client.post(url.as_str()).json(&body))
        })
        .await?;
        parse_chat_response(&text)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let url = self.endpoint("models");
        debug!(url = %url, "listing models");

        let text = with_retry(&self.retry, "list models", || {
            self.send(self.client.get(url.as_str()))
        })
        .await?;
        parse_models_response(&text)
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }
}
