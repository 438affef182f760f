use crate::args::{optional_int, required_str};
use async_trait::async_trait;
use ragloop_core::payload::ThinkingData;
use ragloop_core::{RagloopResult, ToolData, ToolResult};
use ragloop_tools::catalog::THINKING;
use ragloop_tools::{Tool, ToolContext, ToolDescriptor};

/// Records one step of the model's reflective reasoning.
pub struct ThinkingTool {
    descriptor: ToolDescriptor,
}

impl ThinkingTool {
    /// Creates the tool.
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: THINKING.to_string(),
                description: "Think step by step about the problem. Use it to analyze \
                    retrieved material, revise earlier conclusions, and synthesize the final \
                    answer once all retrieval steps are done. Each call records one thought."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "thought": {
                            "type": "string",
                            "description": "The current thinking step"
                        },
                        "thought_number": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Position of this thought in the sequence"
                        },
                        "total_thoughts": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Current estimate of thoughts needed; may be revised"
                        },
                        "next_thought_needed": {
                            "type": "boolean",
                            "description": "Whether another thought should follow"
                        }
                    },
                    "required": ["thought"]
                }),
            },
        }
    }
}

impl Default for ThinkingTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ThinkingTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult> {
        let thought = required_str(&arguments, "thought")?;
        let thought_number = clamp_u32(optional_int(&arguments, "thought_number")?.unwrap_or(1));
        // The estimate grows when the model outruns it.
        let total_thoughts = clamp_u32(
            optional_int(&arguments, "total_thoughts")?.unwrap_or(i64::from(thought_number)),
        )
        .max(thought_number);
        let next_thought_needed = arguments["next_thought_needed"].as_bool().unwrap_or(false);

        let mut output = format!("Thought {thought_number}/{total_thoughts}: {thought}\n");
        if next_thought_needed {
            output.push_str("Continue with the next thought.\n");
        } else {
            output.push_str("Thinking complete. Proceed with the answer or the next retrieval step.\n");
        }

        Ok(ToolResult::with_data(
            output,
            ToolData::Thinking(ThinkingData {
                thought,
                thought_number,
                total_thoughts,
                next_thought_needed,
            }),
        ))
    }
}

fn clamp_u32(n: i64) -> u32 {
    u32::try_from(n.max(1)).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_thought() {
        let result = ThinkingTool::new()
            .execute(
                &ToolContext::new(),
                json!({"thought": "A uses B", "thought_number": 4, "total_thoughts": 2, "next_thought_needed": true}),
            )
            .await
            .unwrap();
        assert!(result.output.starts_with("Thought 4/4: A uses B"));
        match result.data.unwrap() {
            ToolData::Thinking(t) => {
                assert_eq!(t.total_thoughts, 4);
                assert!(t.next_thought_needed);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_thought_is_required() {
        let err = ThinkingTool::new()
            .execute(&ToolContext::new(), json!({"thought_number": 1}))
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }
}
