use crate::types::{ChunkPage, ChunkType, Knowledge, KnowledgeBase, Pagination, SearchParams, SearchResult};
use async_trait::async_trait;
use ragloop_core::RagloopResult;

/// Knowledge base metadata and relevance search.
#[async_trait]
pub trait KnowledgeBaseService: Send + Sync {
    /// Resolves a knowledge base. Unknown ids return `RagloopError::NotFound`.
    async fn get_knowledge_base(&self, id: &str) -> RagloopResult<KnowledgeBase>;

    /// Runs a hybrid (vector + keyword) search against one knowledge base.
    async fn hybrid_search(
        &self,
        knowledge_base_id: &str,
        params: &SearchParams,
    ) -> RagloopResult<Vec<SearchResult>>;
}

/// Paged access to a document's chunks.
#[async_trait]
pub trait ChunkService: Send + Sync {
    /// Lists one page of chunks of the given types, ordered by chunk index.
    /// An unknown document returns `RagloopError::NotFound`, distinct from an
    /// empty page.
    async fn list_paged_chunks(
        &self,
        knowledge_id: &str,
        pagination: Pagination,
        chunk_types: &[ChunkType],
    ) -> RagloopResult<ChunkPage>;
}

/// Document metadata.
#[async_trait]
pub trait KnowledgeService: Send + Sync {
    /// Resolves a document.
    async fn get_knowledge(&self, id: &str) -> RagloopResult<Knowledge>;
}
