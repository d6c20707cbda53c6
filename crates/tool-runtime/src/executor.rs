//! The boundary where tool failures stop being errors.
//!
//! Whatever a tool returns, the executor hands back a [`ToolResult`] the
//! model can read, so one bad call never ends the conversation.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::notify::Notification;
use crate::registry::ToolRegistry;
use crate::tool::{ToolCallRequest, ToolContext, ToolResult, ToolSpec};

#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    context: ToolContext,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, context: ToolContext) -> Self {
        Self { registry, context }
    }

    pub fn describe(&self) -> Vec<ToolSpec> {
        self.registry.describe()
    }

    /// Run one request to completion. Never fails.
    pub async fn execute(&self, request: &ToolCallRequest) -> ToolResult {
        debug!(tool = %request.name, id = %request.id, "executing tool call");
        let outcome = self
            .registry
            .dispatch(&request.name, &request.arguments, &self.context)
            .await;

        let result = match outcome {
            Ok(content) => ToolResult {
                tool_call_id: request.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => {
                warn!(tool = %request.name, id = %request.id, error = %e, "tool call failed");
                ToolResult {
                    tool_call_id: request.id.clone(),
                    content: format!("Error calling `{}`: {}", request.name, e),
                    is_error: true,
                }
            }
        };

        self.context.notifier.notify(Notification::ToolFinished {
            tool: request.name.clone(),
            is_error: result.is_error,
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jail::PathJail;
    use crate::notify::notification_channel;
    use crate::tool::{Arguments, EchoTool};

    fn executor() -> (tempfile::TempDir, ToolExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let ctx = ToolContext::new(PathJail::new(dir.path()).unwrap());
        (dir, ToolExecutor::new(Arc::new(registry), ctx))
    }

    fn request(name: &str, args: &[(&str, &str)]) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: args.iter().copied().collect::<Arguments>(),
        }
    }

    #[tokio::test]
    async fn test_success_carries_call_id() {
        let (_dir, executor) = executor();
        let result = executor.execute(&request("echo", &[("message", "hi")])).await;
        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.content, "hi");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_result() {
        let (_dir, executor) = executor();
        let result = executor.execute(&request("nope", &[])).await;
        assert!(result.is_error);
        assert_eq!(result.content, "Error calling `nope`: Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_invalid_input_becomes_result() {
        let (_dir, executor) = executor();
        let result = executor.execute(&request("echo", &[])).await;
        assert!(result.is_error);
        assert!(result.content.contains("missing 'message' argument"));
    }

    #[tokio::test]
    async fn test_publishes_tool_finished() {
        let dir = tempfile::tempdir().unwrap();
        let (notifier, mut rx) = notification_channel(8);
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let ctx = ToolContext::new(PathJail::new(dir.path()).unwrap()).with_notifier(notifier);
        let executor = ToolExecutor::new(Arc::new(registry), ctx);

        executor.execute(&request("echo", &[("message", "x")])).await;
        assert_eq!(
            rx.drain(),
            vec![Notification::ToolFinished {
                tool: "echo".to_string(),
                is_error: false
            }]
        );
    }
}
