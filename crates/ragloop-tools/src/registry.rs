use crate::catalog::ToolFilter;
use crate::tool::{Tool, ToolContext, ToolDescriptor};
use ragloop_core::{RagloopError, RagloopResult, ToolCall, ToolResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Central registry of the tools available to one runtime.
///
/// Built explicitly at startup and shared by `Arc`; read-only afterwards.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool. A second tool with the same name is rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> RagloopResult<()> {
        let name = tool.descriptor().name.clone();
        if self.tools.contains_key(&name) {
            return Err(RagloopError::Config(format!(
                "tool '{name}' is already registered"
            )));
        }
        info!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All descriptors, sorted by name.
    pub fn list_descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut descriptors: Vec<&ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Descriptors to advertise to the model under `filter`, sorted by name.
    pub fn advertised(&self, filter: &ToolFilter) -> Vec<ToolDescriptor> {
        self.list_descriptors()
            .into_iter()
            .filter(|d| filter.allows(&d.name))
            .cloned()
            .collect()
    }

    /// Runs a tool by name, surfacing failures as errors. Intended for direct
    /// callers; the agent loop uses [`ToolRegistry::dispatch`].
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RagloopError::ToolNotFound(name.to_string()))?;
        if ctx.cancel.is_cancelled() {
            return Err(RagloopError::Cancelled);
        }
        tool.execute(ctx, arguments).await
    }

    /// Dispatches a model tool call. Never faults: unknown tools, disabled
    /// tools, malformed arguments, and tool errors all come back as
    /// `ToolResult { success: false }` with guidance.
    pub async fn dispatch(
        &self,
        ctx: &ToolContext,
        call: &ToolCall,
        filter: &ToolFilter,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Unknown tool requested");
            return ToolResult::failure(
                format!("Tool not found: {}", call.name),
                format!("Registered tools: {}", self.names().join(", ")),
            );
        };

        if !filter.allows(&call.name) {
            warn!(tool = %call.name, call_id = %call.id, "Tool not enabled for execution");
            return ToolResult::failure(
                format!("Tool '{}' is not enabled for execution", call.name),
                "Continue with the tools that are enabled for this session.",
            );
        }

        let arguments = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Malformed tool arguments");
                return ToolResult::from_error(&e);
            }
        };

        if ctx.cancel.is_cancelled() {
            return ToolResult::from_error(&RagloopError::Cancelled);
        }

        match tool.execute(ctx, arguments).await {
            Ok(result) => {
                info!(
                    tool = %call.name,
                    call_id = %call.id,
                    success = result.success,
                    "Tool executed"
                );
                result
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool execution failed");
                ToolResult::from_error(&e)
            }
        }
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
