//! File writing tool with parent directory creation.

use async_trait::async_trait;
use tracing::debug;

use crate::notify::Notification;
use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// Write or create files, creating parent directories as needed.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write content to a file, overwriting it and creating parent directories if needed."
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[
            Param::required("path", "File path relative to the working directory"),
            Param::required("content", "Content to write to the file"),
        ];
        PARAMS
    }

    async fn execute(&self, args: &Arguments, context: &ToolContext) -> Result<String, ToolError> {
        let requested = args.require("path")?;
        let content = args.require("content")?;
        let path = context.jail.resolve(requested)?;

        if context.jail.is_root(&path) {
            return Err(ToolError::InvalidInput(
                "path must name a file, not the working directory".to_string(),
            ));
        }

        debug!(path = %path.display(), bytes = content.len(), "writing file");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::Io {
                    path: requested.to_string(),
                    source: e,
                })?;
        }

        tokio::fs::write(&path, content).await.map_err(|e| ToolError::Io {
            path: requested.to_string(),
            source: e,
        })?;

        context.notifier.notify(Notification::FileWritten {
            path: requested.to_string(),
            content: content.to_string(),
        });
        Ok(format!("Wrote {} bytes to {}", content.len(), requested))
    }
}
