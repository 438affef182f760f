use ragloop_tools::ToolDescriptor;
use serde::{Deserialize, Serialize};

/// Which tool, if any, the model must call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides.
    Auto,
    /// The model must call at least one tool.
    Required,
    /// The model must answer without tools.
    None,
    /// The model must call the named function.
    Function(String),
}

impl ToolChoice {
    /// Wire encoding in the OpenAI chat completions format.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::Required => serde_json::json!("required"),
            ToolChoice::None => serde_json::json!("none"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": {"name": name}
            }),
        }
    }
}

/// Structured output format requested from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Any valid JSON object.
    JsonObject,
    /// JSON matching the given schema.
    JsonSchema {
        /// Schema name reported to the vendor.
        name: String,
        /// The JSON schema.
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    /// Wire encoding in the OpenAI chat completions format.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            ResponseFormat::JsonObject => serde_json::json!({"type": "json_object"}),
            ResponseFormat::JsonSchema { name, schema } => serde_json::json!({
                "type": "json_schema",
                "json_schema": {"name": name, "schema": schema}
            }),
        }
    }
}

/// Per-request options. Unset fields are left out of the wire body so the
/// vendor's defaults apply.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling mass.
    pub top_p: Option<f32>,
    /// Sampling seed.
    pub seed: Option<i64>,
    /// Legacy output token cap.
    pub max_tokens: Option<u32>,
    /// Output token cap for vendors that renamed `max_tokens`.
    pub max_completion_tokens: Option<u32>,
    /// Frequency penalty.
    pub frequency_penalty: Option<f32>,
    /// Presence penalty.
    pub presence_penalty: Option<f32>,
    /// Reasoning toggle; translated per model family.
    pub thinking: Option<bool>,
    /// Tools advertised to the model.
    pub tools: Vec<ToolDescriptor>,
    /// Tool-choice directive. Dropped when no tools are advertised.
    pub tool_choice: Option<ToolChoice>,
    /// Structured output format.
    pub response_format: Option<ResponseFormat>,
}

impl ChatOptions {
    /// Options advertising `tools` with everything else unset.
    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_choice_wire() {
        assert_eq!(ToolChoice::Required.to_wire(), serde_json::json!("required"));
        assert_eq!(
            ToolChoice::Function("thinking".into()).to_wire()["function"]["name"],
            "thinking"
        );
    }

    #[test]
    fn test_response_format_wire() {
        let format = ResponseFormat::JsonSchema {
            name: "answer".into(),
            schema: serde_json::json!({"type": "object"}),
        };
        let wire = format.to_wire();
        assert_eq!(wire["type"], "json_schema");
        assert_eq!(wire["json_schema"]["name"], "answer");
        assert_eq!(ResponseFormat::JsonObject.to_wire()["type"], "json_object");
    }
}
