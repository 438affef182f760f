use ragloop_core::{Message, ToolCall};
use serde::{Deserialize, Serialize};

/// Token accounting reported by the vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Generated tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Prompt plus generated tokens.
    #[serde(default)]
    pub total_tokens: u64,
}

/// A complete model turn, whether it arrived in one body or was assembled
/// from a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Answer text. May be empty when the model only calls tools.
    pub content: String,
    /// Reasoning text, for models that expose it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Requested tool calls, in vendor index order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Vendor finish reason (`stop`, `tool_calls`, `length`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Token usage, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Whether the model asked for tools.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The assistant message to append to the conversation.
    pub fn to_message(&self) -> Message {
        if self.has_tool_calls() {
            Message::assistant_tool_calls(self.content.clone(), self.tool_calls.clone())
        } else {
            Message::assistant(self.content.clone())
        }
    }
}
