use async_trait::async_trait;
use tracing::debug;

use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// Remove an empty directory. Never recursive.
pub struct RemoveDirectoryTool;

#[async_trait]
impl Tool for RemoveDirectoryTool {
    fn name(&self) -> &'static str {
        "remove_directory"
    }

    fn description(&self) -> &'static str {
        "Remove an empty directory."
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::required(
            "path",
            "Directory path relative to the working directory",
        )];
        PARAMS
    }

    async fn execute(&self, args: &Arguments, context: &ToolContext) -> Result<String, ToolError> {
        let requested = args.require("path")?;
        let path = context.jail.resolve(requested)?;

        if context.jail.is_root(&path) {
            return Err(ToolError::InvalidInput(
                "the working directory itself cannot be removed".to_string(),
            ));
        }

        // Checked up front: the OS error for a non-empty directory varies by platform.
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolError::io(requested, e))?;
        if entries
            .next_entry()
            .await
            .map_err(|e| ToolError::io(requested, e))?
            .is_some()
        {
            return Err(ToolError::NotEmpty(requested.to_string()));
        }

        debug!(path = %path.display(), "removing directory");

        tokio::fs::remove_dir(&path)
            .await
            .map_err(|e| ToolError::io(requested, e))?;
        Ok(format!("Directory removed: {requested}"))
    }
}
