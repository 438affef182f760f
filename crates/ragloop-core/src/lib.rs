//! Core types and error definitions for the ragloop agent runtime.
//!
//! This crate provides the foundational types shared across all ragloop crates,
//! including error handling, chat message representations, the tool result
//! envelope, and the structured payloads tools attach to their results.
//!
//! # Main types
//!
//! - [`RagloopError`]: Unified error enum for all ragloop subsystems.
//! - [`RagloopResult`]: Convenience alias for `Result<T, RagloopError>`.
//! - [`Message`] / [`Role`] / [`ToolCall`]: Provider-neutral chat messages.
//! - [`ToolResult`]: The `{success, output, error, data}` envelope every tool returns.
//! - [`ToolData`]: Tagged union of per-tool structured payloads.
//! - [`PlanStep`] / [`StepStatus`]: Retrieval plan snapshots.

/// Error type and result alias.
pub mod error;
/// Chat messages and tool calls.
pub mod message;
/// Structured tool payloads.
pub mod payload;
/// Plan steps and status tallies.
pub mod plan;
/// The tool result envelope.
pub mod tool;

pub use error::{RagloopError, RagloopResult};
pub use message::{validate_tool_replies, Message, Role, ToolCall};
pub use payload::ToolData;
pub use plan::{PlanCounts, PlanStep, StepStatus};
pub use tool::ToolResult;
