//! Built-in planning and retrieval tools for the ragloop agent runtime.
//!
//! # Main entry points
//!
//! - [`register_builtins()`]: Register every built-in tool.
//! - [`register_planning_tools()`]: Register the collaborator-free tools (`todo_write`, `thinking`).
//! - [`register_knowledge_tools()`]: Register the retrieval tools over the given services.

mod args;
/// Multi-source semantic search tool.
pub mod knowledge_search;
/// Paged chunk listing tool.
pub mod list_knowledge_chunks;
/// Knowledge graph query tool.
pub mod query_knowledge_graph;
mod report;
/// Reflective reasoning tool.
pub mod thinking;
/// Retrieval plan tool.
pub mod todo_write;

pub use knowledge_search::KnowledgeSearchTool;
pub use list_knowledge_chunks::ListKnowledgeChunksTool;
pub use query_knowledge_graph::QueryKnowledgeGraphTool;
pub use thinking::ThinkingTool;
pub use todo_write::TodoWriteTool;

use ragloop_core::RagloopResult;
use ragloop_knowledge::{ChunkService, InMemoryKnowledgeStore, KnowledgeBaseService, KnowledgeService};
use ragloop_tools::ToolRegistry;
use std::sync::Arc;

/// The knowledge collaborators the retrieval tools call.
#[derive(Clone)]
pub struct KnowledgeServices {
    /// Knowledge base metadata and search.
    pub knowledge_bases: Arc<dyn KnowledgeBaseService>,
    /// Paged chunk access.
    pub chunks: Arc<dyn ChunkService>,
    /// Document metadata.
    pub documents: Arc<dyn KnowledgeService>,
}

impl KnowledgeServices {
    /// Uses one in-memory store for every collaborator.
    pub fn from_store(store: Arc<InMemoryKnowledgeStore>) -> Self {
        Self {
            knowledge_bases: store.clone(),
            chunks: store.clone(),
            documents: store,
        }
    }
}

/// Register `todo_write` and `thinking`.
pub fn register_planning_tools(registry: &mut ToolRegistry) -> RagloopResult<()> {
    registry.register(Arc::new(TodoWriteTool::new()))?;
    registry.register(Arc::new(ThinkingTool::new()))?;
    Ok(())
}

/// Register the retrieval tools. `default_knowledge_base_ids` is searched by
/// `knowledge_search` when a call names no knowledge bases.
pub fn register_knowledge_tools(
    registry: &mut ToolRegistry,
    services: &KnowledgeServices,
    default_knowledge_base_ids: Vec<String>,
) -> RagloopResult<()> {
    registry.register(Arc::new(KnowledgeSearchTool::new(
        services.knowledge_bases.clone(),
        default_knowledge_base_ids,
    )))?;
    registry.register(Arc::new(QueryKnowledgeGraphTool::new(
        services.knowledge_bases.clone(),
    )))?;
    registry.register(Arc::new(ListKnowledgeChunksTool::new(
        services.chunks.clone(),
        services.documents.clone(),
    )))?;
    Ok(())
}

/// Register every built-in tool.
pub fn register_builtins(
    registry: &mut ToolRegistry,
    services: &KnowledgeServices,
    default_knowledge_base_ids: Vec<String>,
) -> RagloopResult<()> {
    register_planning_tools(registry)?;
    register_knowledge_tools(registry, services, default_knowledge_base_ids)
}
