use crate::payload::ToolData;
use crate::RagloopError;
use serde::{Deserialize, Serialize};

/// The uniform result envelope returned by every tool.
///
/// `success == false` always carries a non-empty `error`. `output` is the
/// human-readable transcript fed back to the model; `data` is the structured
/// payload for programmatic consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the call succeeded.
    pub success: bool,
    /// Human-readable output.
    #[serde(default)]
    pub output: String,
    /// Error description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ToolData>,
}

impl ToolResult {
    /// Creates a successful result with text output only.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            data: None,
        }
    }

    /// Creates a successful result with a structured payload.
    pub fn with_data(output: impl Into<String>, data: ToolData) -> Self {
        Self {
            data: Some(data),
            ..Self::success(output)
        }
    }

    /// Creates a failed result. `guidance` tells the model what to try next.
    pub fn failure(error: impl Into<String>, guidance: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }
        Self {
            success: false,
            output: guidance.into(),
            error: Some(error),
            data: None,
        }
    }

    /// Folds a runtime error into a failed result with guidance text.
    pub fn from_error(err: &RagloopError) -> Self {
        let guidance = match err {
            RagloopError::InvalidArguments(_) | RagloopError::Json(_) => {
                "Check the tool's parameter schema and call it again with corrected arguments."
            }
            RagloopError::ToolNotFound(_) => {
                "Only call tools that are listed in the available tool definitions."
            }
            RagloopError::NotFound(_) => {
                "Verify the identifier; it may be wrong or the item may have been removed."
            }
            RagloopError::Cancelled => "The request was cancelled before the tool finished.",
            _ => "The tool could not complete. Try again, or continue with other tools.",
        };
        Self::failure(err.to_string(), guidance)
    }

    /// The error message, or an empty string on success.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    /// Text sent back to the model as the tool-role message content.
    pub fn to_model_content(&self) -> String {
        if self.success {
            return self.output.clone();
        }
        if self.output.is_empty() {
            format!("Error: {}", self.error_message())
        } else {
            format!("Error: {}\n{}", self.error_message(), self.output)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("output");
        assert!(result.success);
        assert_eq!(result.output, "output");
        assert!(result.error.is_none());
        assert_eq!(result.to_model_content(), "output");
    }

    #[test]
    fn test_failure_never_has_empty_error() {
        let result = ToolResult::failure("  ", "retry later");
        assert!(!result.success);
        assert_eq!(result.error_message(), "unknown error");
    }

    #[test]
    fn test_from_error_includes_guidance() {
        let err = RagloopError::InvalidArguments("query is required".into());
        let result = ToolResult::from_error(&err);
        assert!(!result.success);
        assert!(result.error_message().contains("query is required"));
        assert!(result.output.contains("parameter schema"));
        let content = result.to_model_content();
        assert!(content.starts_with("Error: Invalid arguments"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ToolResult::success("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "output": "ok"}));
    }
}
