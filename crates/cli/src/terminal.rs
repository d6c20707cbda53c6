use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use nomina_tool_runtime::{ModelInfo, Notification};
use std::io::{self, BufRead, Write};

/// Line that ends a multi-line prompt.
pub const END_MARKER: &str = "END";

/// Longest file/command body echoed to the terminal.
const PREVIEW_CHARS: usize = 500;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const USER_PROMPT: Color = Color::Green;
    const ASSISTANT_TEXT: Color = Color::Cyan;
    const TOOL_CALL: Color = Color::Yellow;
    const TOOL_RESULT: Color = Color::DarkGreen;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// What the user asked for at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    Clear,
    Models,
    Exit,
    Empty,
}

impl ReplInput {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ReplInput::Empty,
            "exit" | "quit" | "/exit" | "/quit" => ReplInput::Exit,
            "/clear" => ReplInput::Clear,
            "/models" => ReplInput::Models,
            _ => ReplInput::Message(trimmed.to_string()),
        }
    }
}

/// Collect lines until one reads `END` or input runs out.
///
/// Returns `None` when the input is exhausted before anything was typed.
pub fn read_multiline(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut lines = Vec::new();
    let mut saw_input = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        saw_input = true;
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim() == END_MARKER {
            break;
        }
        lines.push(line.to_string());
    }
    if !saw_input {
        return Ok(None);
    }
    Ok(Some(lines.join("\n").trim().to_string()))
}

fn preview(text: &str) -> String {
    let total = text.chars().count();
    if total > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}... ({total} chars total)")
    } else {
        text.to_string()
    }
}

/// Manages terminal output for the interactive REPL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the startup banner.
    pub fn print_banner(&self, jail: &str, model: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("nomina"),
            ResetColor,
            Print(" - sandboxed agent\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Jail: {jail}\nModel: {model}\n")),
            Print(format!(
                "Type a prompt over one or more lines and finish with a line `{END_MARKER}`.\n"
            )),
            Print("Commands: /clear, /models, exit or quit.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_prompt(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::USER_PROMPT),
            Print(format!("you (end with {END_MARKER})>\n")),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_reply(&self, text: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("\nnomina:\n"),
            SetForegroundColor(Colors::ASSISTANT_TEXT),
            Print(format!("{text}\n")),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_models(&self, models: &[ModelInfo]) -> Result<()> {
        let mut stdout = io::stdout();
        if models.is_empty() {
            return self.print_info("No models reported by the endpoint.");
        }
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("Available models:\n"),
            ResetColor,
        )?;
        for model in models {
            execute!(stdout, Print(format!("  {:<48} {}\n", model.id, model.name)))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Render a side-channel event from the session worker.
    pub fn display_notification(&self, notification: &Notification) -> Result<()> {
        let mut stdout = io::stdout();
        match notification {
            Notification::FileWritten { path, content } => execute!(
                stdout,
                SetForegroundColor(Colors::TOOL_CALL),
                Print(format!("[wrote {path}]\n")),
                SetForegroundColor(Colors::TOOL_RESULT),
                Print(format!("{}\n", preview(content))),
                ResetColor,
            )?,
            Notification::FileRead { path, .. } => execute!(
                stdout,
                SetForegroundColor(Colors::TOOL_CALL),
                Print(format!("[read {path}]\n")),
                ResetColor,
            )?,
            Notification::DirectoryListed { path, listing } => execute!(
                stdout,
                SetForegroundColor(Colors::TOOL_CALL),
                Print(format!("[listed {path}]\n")),
                SetForegroundColor(Colors::TOOL_RESULT),
                Print(format!("{listing}\n")),
                ResetColor,
            )?,
            Notification::CommandFinished {
                command,
                output,
                exit_code,
            } => {
                let status = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                execute!(
                    stdout,
                    SetForegroundColor(Colors::TOOL_CALL),
                    Print(format!("[$ {command}] exit {status}\n")),
                    SetForegroundColor(Colors::TOOL_RESULT),
                    Print(preview(output)),
                    ResetColor,
                )?
            }
            Notification::ToolFinished { tool, is_error: true } => execute!(
                stdout,
                SetForegroundColor(Colors::ERROR),
                Print(format!("[{tool} failed]\n")),
                ResetColor,
            )?,
            Notification::ToolFinished { .. } | Notification::TurnFinished { .. } => {}
            Notification::Status { message } => execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("({message})\n")),
                ResetColor,
            )?,
            Notification::TurnFailed { error } => execute!(
                stdout,
                SetForegroundColor(Colors::ERROR),
                Print(format!("[turn failed: {error}]\n")),
                ResetColor,
            )?,
        }
        stdout.flush()?;
        Ok(())
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an info message.
    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}
