//! Directory listing tool.

use async_trait::async_trait;
use tracing::debug;

use crate::notify::Notification;
use crate::tool::{Arguments, Param, Tool, ToolContext, ToolError};

/// First line of every listing.
pub const LISTING_HEADER: &str = "The directory contains:";

/// List a directory's entries, one per line, sorted by name. Directories
/// carry a trailing `/`.
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "List the files and directories in a directory. Directories end with '/'."
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[Param::optional(
            "directory",
            "Directory relative to the working directory",
            ".",
        )];
        PARAMS
    }

    async fn execute(&self, args: &Arguments, context: &ToolContext) -> Result<String, ToolError> {
        let requested = args.require("directory")?;
        let path = context.jail.resolve(requested)?;

        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolError::io(requested, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ToolError::io(requested, e))?
        {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .map_err(|e| ToolError::io(requested, e))?;
            if is_dir {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        debug!(path = %path.display(), entries = entries.len(), "listed directory");

        let mut listing = String::from(LISTING_HEADER);
        for entry in &entries {
            listing.push('\n');
            listing.push_str(entry);
        }

        context.notifier.notify(Notification::DirectoryListed {
            path: context.jail.display_relative(&path),
            listing: listing.clone(),
        });
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jail::PathJail;

    fn setup() -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(PathJail::new(dir.path()).unwrap());
        (dir, ctx)
    }

    fn args(directory: &str) -> Arguments {
        [("directory", directory)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_sorted_with_directory_marker() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let out = ListFilesTool.execute(&args("."), &ctx).await.unwrap();
        assert_eq!(out, "The directory contains:\na.txt\nb.txt\nsub/");
    }

    #[tokio::test]
    async fn test_empty_directory_is_header_only() {
        let (_dir, ctx) = setup();
        let out = ListFilesTool.execute(&args("."), &ctx).await.unwrap();
        assert_eq!(out, LISTING_HEADER);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let (_dir, ctx) = setup();
        let err = ListFilesTool.execute(&args("nope"), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_parent_rejected() {
        let (_dir, ctx) = setup();
        let err = ListFilesTool.execute(&args(".."), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation { .. }));
    }

    #[test]
    fn test_directory_is_optional() {
        assert!(ListFilesTool.definition().required().is_empty());
    }
}
