//! Shell command execution tool.
//!
//! Runs commands via `sh -c` inside the jail root with stderr folded into
//! stdout and a wall-clock timeout. On unix the shell leads its own process
//! group, so a timeout takes down background jobs and subshells with it.

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::notify::Notification;
use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// Execute a shell command with the jail root as working directory.
///
/// A nonzero exit is reported in the output, not as an error. Only spawn
/// failures and timeouts are errors.
pub struct RunShellCommandTool;

impl RunShellCommandTool {
    fn path_env(extra: Option<&str>) -> Option<String> {
        let extra = extra.filter(|p| !p.is_empty())?;
        match std::env::var("PATH") {
            Ok(current) if !current.is_empty() => Some(format!("{extra}:{current}")),
            _ => Some(extra.to_string()),
        }
    }

    fn describe_status(status: ExitStatus) -> String {
        match status.code() {
            Some(code) => format!("[exit status: {code}]"),
            None => "[terminated by signal]".to_string(),
        }
    }

    /// Kill everything the command started, then reap the shell.
    async fn terminate(child: &mut Child, pgid: Option<u32>) {
        #[cfg(unix)]
        if let Some(pgid) = pgid.and_then(|id| i32::try_from(id).ok()) {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                debug!(pgid, error = %e, "failed to kill process group");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;

        if let Err(e) = child.kill().await {
            debug!(error = %e, "failed to reap timed out shell");
        }
    }
}

#[async_trait]
impl Tool for RunShellCommandTool {
    fn name(&self) -> &'static str {
        "run_shell_command"
    }

    fn description(&self) -> &'static str {
        "Run a shell command in the working directory and return its combined output and exit status."
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required("command", "The shell command to execute")];
        PARAMS
    }

    async fn execute(&self, args: &Arguments, context: &ToolContext) -> Result<String, ToolError> {
        let command = args.require("command")?;
        let root = context.jail.root();
        let timeout = context.shell.timeout;

        debug!(
            command,
            timeout_secs = timeout.as_secs(),
            working_dir = %root.display(),
            "executing shell command"
        );

        // `exec 2>&1` merges the streams inside the shell so their
        // interleaving matches what a terminal would show.
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("exec 2>&1\n{command}"))
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(path) = Self::path_env(context.shell.extra_path.as_deref()) {
            cmd.env("PATH", path);
        }

        let mut child = cmd.spawn().map_err(|e| ToolError::Io {
            path: root.display().to_string(),
            source: e,
        })?;
        let pgid = child.id();
        let mut stdout = child.stdout.take();

        let run = async {
            let mut buf = Vec::new();
            if let Some(out) = stdout.as_mut() {
                out.read_to_end(&mut buf).await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((buf, status))
        };
        let outcome = tokio::time::timeout(timeout, run).await;

        let (stdout, status) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                return Err(ToolError::Io {
                    path: root.display().to_string(),
                    source: e,
                });
            }
            Err(_) => {
                warn!(command, timeout_secs = timeout.as_secs(), "command timed out");
                Self::terminate(&mut child, pgid).await;
                return Err(ToolError::Timeout(timeout));
            }
        };

        let text = String::from_utf8_lossy(&stdout).into_owned();
        if !status.success() {
            debug!(status = ?status, "command returned non-zero exit code");
        }

        let mut content = text.clone();
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&Self::describe_status(status));

        context.notifier.notify(Notification::CommandFinished {
            command: command.to_string(),
            output: text,
            exit_code: status.code(),
        });
        Ok(content)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::jail::PathJail;
    use crate::notify::notification_channel;
    use crate::tool::ShellOptions;
    use std::time::Duration;

    fn setup(timeout: Duration) -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(PathJail::new(dir.path()).unwrap()).with_shell(ShellOptions {
            timeout,
            extra_path: None,
        });
        (dir, ctx)
    }

    fn args(command: &str) -> Arguments {
        [("command", command)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_echo_command() {
        let (_dir, ctx) = setup(Duration::from_secs(10));
        let out = RunShellCommandTool.execute(&args("echo hello"), &ctx).await.unwrap();
        assert_eq!(out, "hello\n[exit status: 0]");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_data() {
        let (_dir, ctx) = setup(Duration::from_secs(10));
        let out = RunShellCommandTool
            .execute(&args("echo oops >&2; exit 3"), &ctx)
            .await
            .unwrap();
        assert!(out.contains("oops"));
        assert!(out.ends_with("[exit status: 3]"));
    }

    #[tokio::test]
    async fn test_runs_in_jail_root() {
        let (dir, ctx) = setup(Duration::from_secs(10));
        RunShellCommandTool
            .execute(&args("echo made > here.txt"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("here.txt")).unwrap(),
            "made\n"
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let (_dir, ctx) = setup(Duration::from_secs(1));
        let err = RunShellCommandTool.execute(&args("sleep 5"), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_timeout_kills_background_jobs() {
        let (dir, ctx) = setup(Duration::from_secs(1));
        let err = RunShellCommandTool
            .execute(&args("(sleep 2; touch after.txt) & wait"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout(_)));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!dir.path().join("after.txt").exists());
    }

    #[tokio::test]
    async fn test_notifies_exit_code() {
        let (_dir, ctx) = setup(Duration::from_secs(10));
        let (notifier, mut rx) = notification_channel(4);
        let ctx = ctx.with_notifier(notifier);

        RunShellCommandTool.execute(&args("exit 2"), &ctx).await.unwrap();
        assert_eq!(
            rx.drain(),
            vec![Notification::CommandFinished {
                command: "exit 2".to_string(),
                output: String::new(),
                exit_code: Some(2),
            }]
        );
    }

    #[test]
    fn test_path_env_prepends() {
        assert_eq!(RunShellCommandTool::path_env(None), None);
        assert_eq!(RunShellCommandTool::path_env(Some("")), None);
        let path = RunShellCommandTool::path_env(Some("/opt/bin")).unwrap();
        assert!(path.starts_with("/opt/bin"));
    }
}
