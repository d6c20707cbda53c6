use crate::conversation::{Conversation, Message};
use crate::executor::ToolExecutor;
use crate::provider::{CompletionProvider, CompletionRequest, LlmError};
use crate::tool::ToolCallRequest;
use std::sync::Arc;
use tracing::{debug, info};

/// The conversation loop that orchestrates model ↔ tool execution.
///
/// Flow: history → model → tool calls → execute → results → model → ... → final text
///
/// Messages produced during a `chat` call are staged and only committed to
/// the conversation once a final answer arrives. A failed call therefore
/// leaves the history exactly as it was handed in.
pub struct ConversationOrchestrator {
    provider: Arc<dyn CompletionProvider>,
    executor: ToolExecutor,
    model: String,
    temperature: Option<f32>,
    max_iterations: usize,
}

impl ConversationOrchestrator {
    pub const DEFAULT_MAX_ITERATIONS: usize = 25;

    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        executor: ToolExecutor,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            temperature: None,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    /// Run the loop until the model answers without requesting tools.
    ///
    /// On success the assistant/tool exchange and the final reply are
    /// appended to `conversation` and the final reply is returned.
    pub async fn chat(&self, conversation: &mut Conversation) -> Result<Message, ChatError> {
        let tools = self.executor.describe();
        let mut staged: Vec<Message> = Vec::new();

        for iteration in 0..self.max_iterations {
            debug!(iteration, staged = staged.len(), "starting conversation iteration");

            let request = CompletionRequest {
                model: self.model.clone(),
                messages: conversation
                    .messages()
                    .iter()
                    .chain(staged.iter())
                    .cloned()
                    .collect(),
                temperature: self.temperature,
                tools: tools.clone(),
            };

            let mut reply = self.provider.complete(request).await?;

            if !reply.has_tool_calls() {
                reply.tool_calls = None;
                info!(
                    iteration,
                    provider = self.provider.provider_name(),
                    "conversation loop complete"
                );
                staged.push(reply.clone());
                conversation.extend(staged);
                return Ok(reply);
            }

            let requests = parse_tool_calls(&reply)?;
            staged.push(reply);

            info!(iteration, count = requests.len(), "executing tool calls");
            for request in &requests {
                let result = self.executor.execute(request).await;
                staged.push(Message::tool(result));
            }
        }

        Err(ChatError::IterationLimit(self.max_iterations))
    }
}

/// Parse every call of a turn up front so nothing runs if any is malformed.
fn parse_tool_calls(reply: &Message) -> Result<Vec<ToolCallRequest>, ChatError> {
    reply
        .requested_calls()
        .iter()
        .map(|call| {
            call.to_request()
                .map_err(|reason| ChatError::MalformedArguments {
                    tool: call.name.clone(),
                    id: call.id.clone(),
                    reason,
                })
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("Malformed arguments for `{tool}` (call {id}): {reason}")]
    MalformedArguments {
        tool: String,
        id: String,
        reason: String,
    },
    #[error("No final answer after {0} iterations")]
    IterationLimit(usize),
}
