use crate::tool::{Arguments, Tool, ToolContext, ToolError, ToolSpec};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Manages available tools, their schemas, and lookup.
///
/// Populated once at startup, then shared read-only behind an `Arc`.
/// Registration order is the order tools are declared to the model.
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced in place
    /// (last write wins); the collision is logged as a configuration smell.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            warn!(tool = %name, "tool registered twice, replacing previous entry");
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tool specs in registration order (sent with every completion request).
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Run the named tool with defaults applied to `arguments`.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: &Arguments,
        context: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let arguments = arguments.clone().with_defaults(tool.params());
        debug!(tool = name, args = arguments.len(), "dispatching tool");
        tool.execute(&arguments, context).await
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
