use async_trait::async_trait;
use tracing::debug;

use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// Create a directory and any missing parents. Succeeds if it already exists.
pub struct MakeDirectoryTool;

#[async_trait]
impl Tool for MakeDirectoryTool {
    fn name(&self) -> &'static str {
        "make_directory"
    }

    fn description(&self) -> &'static str {
        "Create a directory, including missing parent directories."
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

        debug!(path = %path.display(), "creating directory");

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ToolError::Io {
                path: requested.to_string(),
                source: e,
            })?;
        Ok(format!("Directory created: {requested}"))
    }
}
