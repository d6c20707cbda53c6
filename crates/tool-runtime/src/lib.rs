pub mod context;
pub mod conversation;
pub mod executor;
pub mod jail;
pub mod notify;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod tool;
pub mod tools;

pub use context::{build_system_prompt, load_project_rules, DEFAULT_RULES_FILE};
pub use conversation::{Content, ContentPart, Conversation, ImageUrl, Message, Role};
pub use executor::ToolExecutor;
pub use jail::{JailError, PathJail};
pub use notify::{
    notification_channel, spawn_observer, Notification, NotificationReceiver, Notifier, Observer,
};
pub use provider::{CompletionProvider, CompletionRequest, LlmError, ModelInfo};
pub use registry::ToolRegistry;
pub use runtime::{ChatError, ConversationOrchestrator};
pub use session::{SessionError, SessionHandle, SessionWorker};
pub use tool::{
    Arguments, Param, ShellOptions, Tool, ToolCall, ToolCallRequest, ToolContext, ToolError,
    ToolResult, ToolSpec,
};
pub use tools::{
    builtin_registry, DeleteFileTool, ListFilesTool, MakeDirectoryTool, ReadFileTool,
    RemoveDirectoryTool, RunShellCommandTool, WriteFileTool,
};
