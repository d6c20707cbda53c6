//! Translation between the runtime's conversation types and the
//! OpenAI-compatible chat completions wire format.

use nomina_tool_runtime::{
    CompletionRequest, Content, LlmError, Message, ModelInfo, Role, ToolCall, ToolSpec,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn from_request(request: &'a CompletionRequest) -> Self {
        let tools: Vec<WireTool> = request.tools.iter().map(WireTool::from_spec).collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            temperature: request.temperature,
            tools,
            tool_choice,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .as_ref()
                .map(|calls| calls.iter().map(WireToolCall::from_call).collect()),
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    fn into_message(self) -> Message {
        let tool_calls = self
            .tool_calls
            .map(|calls| calls.into_iter().map(WireToolCall::into_call).collect::<Vec<_>>())
            .filter(|calls| !calls.is_empty());
        Message {
            role: self.role,
            content: self.content,
            tool_calls,
            tool_call_id: self.tool_call_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// Serialized JSON object. Some providers send the object itself.
    #[serde(default, deserialize_with = "arguments_as_string")]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

fn arguments_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl WireToolCall {
    fn from_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }

    fn into_call(self) -> ToolCall {
        ToolCall::new(self.id, self.function.name, self.function.arguments)
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDecl,
}

#[derive(Debug, Serialize)]
struct WireFunctionDecl {
    name: String,
    description: String,
    parameters: Value,
}

impl WireTool {
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunctionDecl {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.input_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

/// Pull the single assistant message out of a completion response body.
pub(crate) fn parse_chat_response(body: &str) -> Result<Message, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("malformed completion body: {e}")))?;

    if let Some(error) = response.error {
        return Err(LlmError::InvalidResponse(format!("provider error: {error}")));
    }

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.into_message())
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message".into()))
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

pub(crate) fn parse_models_response(body: &str) -> Result<Vec<ModelInfo>, LlmError> {
    let response: ModelsResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("malformed model list: {e}")))?;
    Ok(response
        .data
        .into_iter()
        .map(|m| ModelInfo {
            name: m.name.filter(|n| !n.is_empty()).unwrap_or_else(|| m.id.clone()),
            id: m.id,
        })
        .collect())
}
