use crate::{RagloopError, RagloopResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A system-level instruction or prompt.
    System,
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
    /// Output produced by a tool invocation.
    Tool,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A request from the model to invoke a specific tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the model; tool replies must echo it.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

impl ToolCall {
    /// Creates a tool call from already-encoded arguments.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Generates an id for vendors that omit one.
    pub fn generate_id() -> String {
        format!("call_{}", Uuid::new_v4().simple())
    }

    /// Parses the argument string. An empty string is treated as `{}`.
    pub fn parse_arguments(&self) -> RagloopResult<serde_json::Value> {
        let raw = self.arguments.trim();
        if raw.is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(raw).map_err(|e| {
            RagloopError::InvalidArguments(format!(
                "arguments for '{}' are not valid JSON: {e}",
                self.name
            ))
        })
    }
}

/// A single message exchanged with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    #[serde(default)]
    pub content: String,
    /// Tool name for tool-role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The assistant tool call this message answers (tool role only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls requested by the assistant, in model order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Creates a plain message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// Creates a new message with [`Role::System`].
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates an assistant message carrying tool calls.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Creates a tool-role reply to the call identified by `tool_call_id`.
    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Whether this is an assistant message requesting tools.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Checks that every tool-role message answers a tool call issued by an
/// earlier assistant message, and that no call is answered twice.
pub fn validate_tool_replies(messages: &[Message]) -> RagloopResult<()> {
    let mut issued: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();

    for (idx, msg) in messages.iter().enumerate() {
        match msg.role {
            Role::Assistant => {
                issued.extend(msg.tool_calls.iter().map(|c| c.id.as_str()));
            }
            Role::Tool => {
                let call_id = msg.tool_call_id.as_deref().ok_or_else(|| {
                    RagloopError::Agent(format!("tool message #{idx} has no tool_call_id"))
                })?;
                if !issued.contains(call_id) {
                    return Err(RagloopError::Agent(format!(
                        "tool message #{idx} answers unknown tool call '{call_id}'"
                    )));
                }
                if !answered.insert(call_id) {
                    return Err(RagloopError::Agent(format!(
                        "tool call '{call_id}' answered more than once"
                    )));
                }
            }
            Role::System | Role::User => {}
        }
    }
    Ok(())
}
