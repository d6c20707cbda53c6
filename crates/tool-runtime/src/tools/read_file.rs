//! Whole-file reads.

use async_trait::async_trait;
use tracing::debug;

use crate::notify::Notification;
use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// Return a file's full contents as text.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read the full contents of a text file inside the working directory."
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required(
            "path",
            "File path relative to the working directory",
        )];
        PARAMS
    }

    async fn execute(&self, args: &Arguments, context: &ToolContext) -> Result<String, ToolError> {
        let requested = args.require("path")?;
        let path = context.jail.resolve(requested)?;

        debug!(path = %path.display(), "reading file");

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io(requested, e))?;

        context.notifier.notify(Notification::FileRead {
            path: requested.to_string(),
            content: content.clone(),
        });
        Ok(content)
    }
}
