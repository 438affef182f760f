use async_trait::async_trait;
use ragloop_core::RagloopResult;
use ragloop_core::ToolResult;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Metadata describing a tool's interface. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name; the identity used for registration and dispatch.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters_schema: serde_json::Value,
}

impl ToolDescriptor {
    /// Creates a descriptor.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
        }
    }
}

/// Per-invocation context handed to [`Tool::execute`].
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Cancelled when the surrounding request is abandoned.
    pub cancel: CancellationToken,
}

impl ToolContext {
    /// A context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given token for cancellation.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Trait every tool implements.
///
/// `execute` must be safe to call concurrently. Structurally invalid arguments
/// are reported as `Err(RagloopError::InvalidArguments)`; collaborator
/// failures and "nothing found" outcomes are reported as `Ok` results.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's descriptor.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Runs the tool with already-parsed JSON arguments.
    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult>;
}
