use async_trait::async_trait;
use tracing::debug;

use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// Remove a single file.
pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        "delete_file"
    }

    fn description(&self) -> &'static str {
        "Delete a file inside the working directory."
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

        debug!(path = %path.display(), "deleting file");

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ToolError::io(requested, e))?;
        Ok(format!("File deleted: {requested}"))
    }
}
