use clap::Parser;
use std::path::PathBuf;

/// Sandboxed LLM agent for the terminal.
///
/// The model may read, write and list files and run shell commands, but only
/// inside the jail directory. Flags override the matching environment keys.
#[derive(Parser, Debug)]
#[command(name = "nomina", about = "Sandboxed LLM agent for the terminal")]
pub struct CliArgs {
    /// Configuration profile (prefix for every environment key)
    #[arg(long, env = "NOMINA_PROFILE")]
    pub profile: Option<String>,

    /// Directory the agent is confined to (default: current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Model identifier override
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature override
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum model round trips per turn
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Shell command timeout in seconds
    #[arg(long)]
    pub shell_timeout: Option<u64>,

    /// Base system prompt (project rules are appended to it)
    #[arg(long)]
    pub system_prompt: Option<String>,
}
