//! Tool contract, catalog, and registry for the ragloop agent runtime.
//!
//! A [`Tool`] exposes a [`ToolDescriptor`] (name, description, JSON parameter
//! schema) and an async `execute`. Tools are collected in an explicit
//! [`ToolRegistry`] built at startup and shared by `Arc`; the registry never
//! faults on dispatch, folding every failure into a
//! [`ragloop_core::ToolResult`].

/// Tool name constants, settings-UI definitions, and enable lists.
pub mod catalog;
/// Name-keyed tool registry and dispatch.
pub mod registry;
/// The tool trait and its invocation context.
pub mod tool;

pub use catalog::{available_tool_definitions, default_allowed_tools, AvailableTool, ToolFilter};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolContext, ToolDescriptor};
