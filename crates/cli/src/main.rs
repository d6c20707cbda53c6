mod cli;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use nomina_core::config::{load_dotenv, Config};
use nomina_llm::OpenRouterClient;
use nomina_tool_runtime::{
    build_system_prompt, builtin_registry, notification_channel, spawn_observer,
    CompletionProvider, Conversation, ConversationOrchestrator, Notification, PathJail,
    SessionError, SessionWorker, ShellOptions, ToolContext, ToolExecutor,
};

use crate::cli::CliArgs;
use crate::terminal::{read_multiline, ReplInput, Terminal};

const BASE_SYSTEM_PROMPT: &str = "You are Nomina, a careful software agent working inside a \
sandboxed directory. Use the provided tools to inspect and change files and to run shell \
commands. Paths are relative to the working directory; anything outside it is off limits. \
When the task is done, answer in plain text.";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let terminal = Terminal::new();

    let mut config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    apply_overrides(&mut config, &args);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    // Sandbox
    let root = config
        .jail
        .ensure_root()
        .context("failed to prepare jail directory")?;
    let jail = PathJail::new(&root).context("failed to open jail directory")?;

    // Observer side channel, drained on its own task
    let (notifier, receiver) = notification_channel(config.agent.notify_capacity);
    let observer = spawn_observer(receiver, move |notification: Notification| {
        if let Err(e) = terminal.display_notification(&notification) {
            error!(error = %e, "failed to render notification");
        }
    });

    let context = ToolContext::new(jail)
        .with_shell(ShellOptions {
            timeout: Duration::from_secs(config.shell.timeout_secs),
            extra_path: config.shell.extra_path.clone(),
        })
        .with_notifier(notifier.clone());
    let executor = ToolExecutor::new(Arc::new(builtin_registry()), context);

    let client =
        OpenRouterClient::from_config(&config.llm).context("failed to create LLM client")?;
    let orchestrator =
        ConversationOrchestrator::new(Arc::new(client), executor, config.llm.model.clone())
            .with_temperature(config.llm.temperature)
            .with_max_iterations(config.agent.max_iterations);

    let base_prompt = args.system_prompt.as_deref().unwrap_or(BASE_SYSTEM_PROMPT);
    let system_prompt = build_system_prompt(base_prompt, &root, &config.jail.rules_file);
    let provider = Arc::clone(orchestrator.provider());
    let (session, worker) = SessionWorker::spawn(
        orchestrator,
        Conversation::with_system_prompt(system_prompt),
        notifier,
    );

    terminal.print_banner(&root.display().to_string(), &config.llm.model)?;
    info!(root = %root.display(), "session ready");

    // REPL loop
    loop {
        terminal.print_prompt()?;
        let line = tokio::task::spawn_blocking(|| read_multiline(&mut std::io::stdin().lock()))
            .await
            .context("input reader stopped")??;
        let Some(text) = line else {
            terminal.print_info("Goodbye.")?;
            break;
        };

        match ReplInput::parse(&text) {
            ReplInput::Empty => continue,
            ReplInput::Exit => {
                terminal.print_info("Goodbye!")?;
                break;
            }
            ReplInput::Clear => {
                session.clear().await?;
                terminal.print_info("History cleared.")?;
            }
            ReplInput::Models => match provider.list_models().await {
                Ok(models) => terminal.print_models(&models)?,
                Err(e) => terminal.print_error(&e.to_string())?,
            },
            ReplInput::Message(message) => match session.send(message).await {
                Ok(reply) => terminal.print_reply(&reply.text())?,
                Err(SessionError::Chat(e)) => {
                    error!(error = %e, "turn failed");
                    terminal.print_error(&e.to_string())?;
                }
                Err(e) => return Err(e.into()),
            },
        }
    }

    session.shutdown().await?;
    worker.await.context("session worker panicked")?;
    // Every notifier went down with the worker, so the observer drains and exits.
    observer.await.context("observer task panicked")?;
    Ok(())
}

/// Command-line flags win over environment configuration.
fn apply_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(dir) = &args.dir {
        config.jail.root = dir.clone();
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }
    if let Some(temperature) = args.temperature {
        config.llm.temperature = temperature;
    }
    if let Some(max) = args.max_iterations {
        config.agent.max_iterations = max;
    }
    if let Some(secs) = args.shell_timeout {
        config.shell.timeout_secs = secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::for_profile("NOMINA_CLI_TEST_UNUSED");
        let args = CliArgs::parse_from([
            "nomina",
            "--dir",
            "/srv/sandbox",
            "--model",
            "x/y",
            "--shell-timeout",
            "5",
        ]);
        apply_overrides(&mut config, &args);

        assert_eq!(config.jail.root, std::path::PathBuf::from("/srv/sandbox"));
        assert_eq!(config.llm.model, "x/y");
        assert_eq!(config.shell.timeout_secs, 5);
    }
}
