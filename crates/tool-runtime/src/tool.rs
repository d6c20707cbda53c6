use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::jail::PathJail;
use crate::notify::Notifier;

/// One declared parameter of a tool.
///
/// Parameters without a default are required. Every parameter travels as a
/// string; tools parse further themselves.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub description: &'static str,
    pub default: Option<&'static str>,
}

impl Param {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self { name, description, default: None }
    }

    pub const fn optional(
        name: &'static str,
        description: &'static str,
        default: &'static str,
    ) -> Self {
        Self { name, description, default: Some(default) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
}

/// Describes a tool's interface for LLM consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name (e.g., "read_file")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// Parameters in declaration order
    pub parameters: IndexMap<String, ParameterSpec>,
}

impl ToolSpec {
    /// Derive a spec from a static parameter table.
    pub fn from_params(name: &str, description: &str, params: &[Param]) -> Self {
        let parameters = params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    ParameterSpec {
                        kind: ParamType::String,
                        description: p.description.to_string(),
                        required: p.default.is_none(),
                    },
                )
            })
            .collect();
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// JSON Schema for the parameter object, as function-calling APIs expect it.
    pub fn input_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": spec.kind,
                        "description": spec.description,
                    }),
                )
            })
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
        })
    }
}

/// Parsed tool-call arguments: parameter name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, String>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the transport's serialized form (a JSON object).
    ///
    /// Strings pass through, other scalars keep their JSON text, `null`
    /// counts as absent. An empty string is an empty argument list.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        let map = match value {
            Value::Object(map) => map,
            other => return Err(format!("expected a JSON object, got {}", json_kind(&other))),
        };
        let mut args = BTreeMap::new();
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    args.insert(key, s);
                }
                other => {
                    args.insert(key, other.to_string());
                }
            }
        }
        Ok(Self(args))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> Result<&str, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::InvalidInput(format!("missing '{name}' argument")))
    }

    /// Fill in declared defaults for anything the caller left out.
    pub fn with_defaults(mut self, params: &[Param]) -> Self {
        for param in params {
            if let Some(default) = param.default {
                self.0
                    .entry(param.name.to_string())
                    .or_insert_with(|| default.to_string());
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A tool call as it travels on the wire: arguments still serialized.
///
/// Kept verbatim in history so the assistant turn can be replayed exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this invocation (used to match results)
    pub id: String,
    /// Tool name to execute
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the arguments into an executable request.
    pub fn to_request(&self) -> Result<ToolCallRequest, String> {
        Ok(ToolCallRequest {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: Arguments::from_json(&self.arguments)?,
        })
    }
}

/// A tool call ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Arguments,
}

/// Result of executing a tool, sent back to the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Must match the ToolCall id
    pub tool_call_id: String,
    /// Result content
    pub content: String,
    /// Whether this result represents an error
    pub is_error: bool,
}

/// Shell settings applied to `run_shell_command`.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub timeout: Duration,
    /// Prepended to the inherited `PATH`.
    pub extra_path: Option<String>,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            extra_path: None,
        }
    }
}

/// Everything a tool may touch: the jail, the shell settings, and the
/// channel to the observer.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub jail: PathJail,
    pub shell: ShellOptions,
    pub notifier: Notifier,
}

impl ToolContext {
    pub fn new(jail: PathJail) -> Self {
        Self {
            jail,
            shell: ShellOptions::default(),
            notifier: Notifier::disabled(),
        }
    }

    pub fn with_shell(mut self, shell: ShellOptions) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async. Expected failures (missing
/// file, sandbox violation) come back as `ToolError`; the executor turns them
/// into results the model can read.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Declared parameters, in order.
    fn params(&self) -> &'static [Param];

    fn definition(&self) -> ToolSpec {
        ToolSpec::from_params(self.name(), self.description(), self.params())
    }

    /// Execute with arguments whose defaults are already filled in.
    async fn execute(&self, args: &Arguments, context: &ToolContext) -> Result<String, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Access outside jail is denied: '{requested}' resolves to {resolved}")]
    SandboxViolation { requested: String, resolved: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Directory not empty: {0}")]
    NotEmpty(String),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    /// Classify an I/O failure on a caller-visible path.
    pub fn io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound(path.to_string())
        } else {
            ToolError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Simple echo tool for testing purposes.
#[cfg(any(test, feature = "test-utils"))]
pub struct EchoTool;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echoes back the input message. For testing."
    }

    fn params(&self) -> &'static [Param] {
        const PARAMS: &[Param] = &[
            Param::required("message", "The message to echo back"),
            Param::optional("suffix", "Appended to the message", ""),
        ];
        PARAMS
    }

    async fn execute(&self, args: &Arguments, _context: &ToolContext) -> Result<String, ToolError> {
        let message = args.require("message")?;
        let suffix = args.get("suffix").unwrap_or_default();
        Ok(format!("{message}{suffix}"))
    }
}
