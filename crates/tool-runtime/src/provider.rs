use crate::conversation::Message;
use crate::tool::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything one completion call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    /// Declared tools, in registry order.
    pub tools: Vec<ToolSpec>,
}

/// One entry from the model listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// Trait for completion endpoints that support tool calling.
///
/// This trait lives in tool-runtime (not in crates/llm) because it's
/// defined by the consumer (the conversation loop), not the provider.
/// Implementations live in crates/llm or adapter crates.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one request and return the single assistant message.
    async fn complete(&self, request: CompletionRequest) -> Result<Message, LlmError>;

    /// Models available at the endpoint. Not used by the loop itself.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;

    /// Provider name for logging/debugging (e.g., "openrouter")
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("Authentication failed: {0}")]
    AuthError(String),
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// Server-side and connection failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::NetworkError(_) | LlmError::RateLimited { .. } => true,
            LlmError::InvalidResponse(_) | LlmError::AuthError(_) | LlmError::NotConfigured(_) => {
                false
            }
        }
    }
}

/// Mock provider for testing the conversation loop without real API calls.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::tool::ToolCall;
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// Returns pre-configured replies in FIFO order and records every request.
    #[derive(Default)]
    pub struct MockCompletionProvider {
        replies: Mutex<VecDeque<Result<Message, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        models: Vec<ModelInfo>,
    }

    impl MockCompletionProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
            self.models = models;
            self
        }

        /// Queue a message that will be returned by a later call.
        pub fn queue_message(&self, message: Message) {
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Ok(message));
        }

        /// Queue a plain-text final answer.
        pub fn queue_text(&self, text: &str) {
            self.queue_message(Message::assistant(text));
        }

        /// Queue an assistant turn requesting `(id, name, arguments_json)` calls.
        pub fn queue_tool_calls(&self, calls: &[(&str, &str, &str)]) {
            let calls = calls
                .iter()
                .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
                .collect();
            self.queue_message(Message::assistant_tool_calls(None, calls));
        }

        pub fn queue_error(&self, error: LlmError) {
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Err(error));
        }

        /// Every request seen so far, oldest first.
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for MockCompletionProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<Message, LlmError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::InvalidResponse("no queued reply".to_string())))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Ok(self.models.clone())
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
