pub mod delete_file;
pub mod list_files;
pub mod make_directory;
pub mod read_file;
pub mod remove_directory;
pub mod run_shell_command;
pub mod write_file;

pub use delete_file::DeleteFileTool;
pub use list_files::ListFilesTool;
pub use make_directory::MakeDirectoryTool;
pub use read_file::ReadFileTool;
pub use remove_directory::RemoveDirectoryTool;
pub use run_shell_command::RunShellCommandTool;
pub use write_file::WriteFileTool;

use crate::registry::ToolRegistry;

/// Registry holding the seven built-in filesystem and shell tools.
pub fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool);
    registry.register(WriteFileTool);
    registry.register(DeleteFileTool);
    registry.register(ListFilesTool);
    registry.register(MakeDirectoryTool);
    registry.register(RemoveDirectoryTool);
    registry.register(RunShellCommandTool);
    registry
}
