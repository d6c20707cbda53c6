//! Full conversation turns against a scripted model and a real temp directory.

use nomina_tool_runtime::provider::mock::MockCompletionProvider;
use nomina_tool_runtime::{
    builtin_registry, notification_channel, ChatError, Conversation, ConversationOrchestrator,
    LlmError, Message, Notification, PathJail, Role, ToolContext, ToolExecutor,
};
use std::sync::Arc;

/// A mock that plays back `(id, name, arguments)` tool-call rounds, then `answer`.
fn scripted(rounds: &[&[(&str, &str, &str)]], answer: &str) -> Arc<MockCompletionProvider> {
    let model = MockCompletionProvider::new();
    for calls in rounds {
        model.queue_tool_calls(calls);
    }
    model.queue_text(answer);
    Arc::new(model)
}

fn orchestrator(root: &std::path::Path, model: Arc<MockCompletionProvider>) -> ConversationOrchestrator {
    let ctx = ToolContext::new(PathJail::new(root).unwrap());
    let executor = ToolExecutor::new(Arc::new(builtin_registry()), ctx);
    ConversationOrchestrator::new(model, executor, "scripted-model")
}

fn start(prompt: &str) -> Conversation {
    let mut conv = Conversation::with_system_prompt("You operate inside a sandbox.");
    conv.push(Message::user(prompt));
    conv
}

#[tokio::test]
async fn test_write_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let model = scripted(
        &[
            &[("call_1", "write_file", r#"{"path": "foo.txt", "content": "hi"}"#)],
            &[("call_2", "list_files", r#"{"directory": "."}"#)],
        ],
        "Created foo.txt; it now exists in the directory.",
    );
    let orchestrator = orchestrator(dir.path(), model.clone());

    let mut conv = start("create foo.txt with content 'hi' then list files");
    let reply = orchestrator.chat(&mut conv).await.unwrap();

    assert!(reply.text().contains("foo.txt"));
    assert_eq!(std::fs::read_to_string(dir.path().join("foo.txt")).unwrap(), "hi");

    let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
        ]
    );

    let listing = conv.messages()[5].text();
    assert!(listing.lines().any(|line| line == "foo.txt"), "{listing}");

    // Every request declared all seven tools.
    assert!(model.requests().iter().all(|r| r.tools.len() == 7));
}

#[tokio::test]
async fn test_same_turn_calls_see_earlier_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let model = scripted(
        &[&[
            ("a", "make_directory", r#"{"path": "src"}"#),
            ("b", "write_file", r#"{"path": "src/main.txt", "content": "body"}"#),
            ("c", "run_shell_command", r#"{"command": "cat src/main.txt"}"#),
        ]],
        "done",
    );
    let orchestrator = orchestrator(dir.path(), model);

    let mut conv = start("set up src");
    orchestrator.chat(&mut conv).await.unwrap();

    let results: Vec<(Option<String>, String)> = conv
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| (m.tool_call_id.clone(), m.text()))
        .collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0.as_deref(), Some("a"));
    assert_eq!(results[1].0.as_deref(), Some("b"));
    assert_eq!(results[2].0.as_deref(), Some("c"));
    if cfg!(unix) {
        assert!(results[2].1.starts_with("body"));
    }
}

#[tokio::test]
async fn test_sandbox_violation_is_a_tool_result() {
    let dir = tempfile::tempdir().unwrap();
    let model = scripted(
        &[&[("x", "read_file", r#"{"path": "../../etc/passwd"}"#)]],
        "I am not allowed to read that.",
    );
    let orchestrator = orchestrator(dir.path(), model);

    let mut conv = start("read /etc/passwd");
    orchestrator.chat(&mut conv).await.unwrap();

    let result = conv.messages()[3].text();
    assert!(result.starts_with("Error calling `read_file`: Access outside jail is denied"));
}

#[tokio::test]
async fn test_transport_failure_mid_turn_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let model = MockCompletionProvider::new();
    model.queue_tool_calls(&[("w", "write_file", r#"{"path": "partial.txt", "content": "x"}"#)]);
    model.queue_error(LlmError::ApiError {
        status: 503,
        message: "unavailable".into(),
    });
    let model = Arc::new(model);
    let orchestrator = orchestrator(dir.path(), model);

    let mut conv = start("write something");
    let before = conv.clone();
    let err = orchestrator.chat(&mut conv).await.unwrap_err();

    assert!(matches!(err, ChatError::Llm(LlmError::ApiError { status: 503, .. })));
    assert_eq!(conv, before);
}

#[tokio::test]
async fn test_observer_sees_file_content() {
    let dir = tempfile::tempdir().unwrap();
    let (notifier, mut rx) = notification_channel(32);
    let ctx = ToolContext::new(PathJail::new(dir.path()).unwrap()).with_notifier(notifier);
    let executor = ToolExecutor::new(Arc::new(builtin_registry()), ctx);
    let model = scripted(
        &[&[("w", "write_file", r#"{"path": "notes.md", "content": "remember"}"#)]],
        "saved",
    );
    let orchestrator = ConversationOrchestrator::new(model, executor, "m");

    orchestrator.chat(&mut start("save a note")).await.unwrap();

    let events = rx.drain();
    assert_eq!(
        events[0],
        Notification::FileWritten {
            path: "notes.md".into(),
            content: "remember".into()
        }
    );
    assert!(matches!(events[1], Notification::ToolFinished { is_error: false, .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_timeout_does_not_hang() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ToolContext::new(PathJail::new(dir.path()).unwrap()).with_shell(
        nomina_tool_runtime::ShellOptions {
            timeout: std::time::Duration::from_secs(1),
            extra_path: None,
        },
    );
    let executor = ToolExecutor::new(Arc::new(builtin_registry()), ctx);
    let model = scripted(
        &[&[("s", "run_shell_command", r#"{"command": "sleep 60"}"#)]],
        "it timed out",
    );
    let orchestrator = ConversationOrchestrator::new(model, executor, "m");

    let started = std::time::Instant::now();
    let mut conv = start("sleep");
    orchestrator.chat(&mut conv).await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(30));
    assert_eq!(conv.messages()[3].text(), "Error calling `run_shell_command`: Timeout after 1s");
}
