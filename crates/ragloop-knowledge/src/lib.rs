//! Knowledge collaborator contracts and the multi-source query engine.
//!
//! Document and embedding persistence live outside this workspace; this crate
//! defines the service traits the tools call, an in-memory implementation for
//! tests and local runs, and the concurrent fan-out engine that merges,
//! deduplicates, and ranks hits from several knowledge bases.
//!
//! # Main types
//!
//! - [`KnowledgeBaseService`] / [`ChunkService`] / [`KnowledgeService`]: Collaborator traits.
//! - [`InMemoryKnowledgeStore`]: In-memory implementation of all three.
//! - [`MultiSourceSearch`]: Concurrent fan-out with dedup and ranking.
//! - [`RelevanceLevel`]: Score buckets used in tool reports.

/// Concurrent multi-source search.
pub mod fanout;
/// Relevance score buckets.
pub mod relevance;
/// Collaborator service traits.
pub mod service;
/// In-memory knowledge store.
pub mod store;
/// Knowledge base, document, chunk, and search types.
pub mod types;

pub use fanout::{FanoutReport, FanoutRequest, MultiSourceSearch};
pub use relevance::{relevance_label, RelevanceLevel};
pub use service::{ChunkService, KnowledgeBaseService, KnowledgeService};
pub use store::{InMemoryKnowledgeStore, KnowledgeFixture};
pub use types::{
    Chunk, ChunkPage, ChunkType, ExtractConfig, GraphNode, GraphRelation, ImageInfo, Knowledge,
    KnowledgeBase, MatchType, Pagination, SearchParams, SearchResult,
};
