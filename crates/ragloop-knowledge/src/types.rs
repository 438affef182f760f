use ragloop_core::payload::GraphConfigSummary;
use serde::{Deserialize, Serialize};

pub use ragloop_core::payload::ImageInfo;

/// An entity type configured for graph extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Entity type name, e.g. `Technology`.
    pub name: String,
    /// Attribute names extracted for the entity.
    #[serde(default)]
    pub attributes: Vec<String>,
}

/// A relation type configured for graph extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRelation {
    /// Relation name, e.g. `depends_on`.
    pub name: String,
    /// Source entity type.
    #[serde(default)]
    pub source: String,
    /// Target entity type.
    #[serde(default)]
    pub target: String,
}

/// Graph extraction settings of a knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Entity types.
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Relation types.
    #[serde(default)]
    pub relations: Vec<GraphRelation>,
}

impl ExtractConfig {
    /// Whether at least one entity or relation type is configured.
    pub fn is_configured(&self) -> bool {
        !self.nodes.is_empty() || !self.relations.is_empty()
    }

    /// Type names only, as reported to the model.
    pub fn summary(&self) -> GraphConfigSummary {
        GraphConfigSummary {
            nodes: self.nodes.iter().map(|n| n.name.clone()).collect(),
            relations: self.relations.iter().map(|r| r.name.clone()).collect(),
        }
    }
}

/// A knowledge base (one independent knowledge source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Knowledge base id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Graph extraction settings, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_config: Option<ExtractConfig>,
}

impl KnowledgeBase {
    /// The graph capability flag.
    pub fn has_graph(&self) -> bool {
        self.extract_config
            .as_ref()
            .is_some_and(ExtractConfig::is_configured)
    }
}

/// A document inside a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knowledge {
    /// Document id.
    pub id: String,
    /// Owning knowledge base.
    pub knowledge_base_id: String,
    /// Document title.
    #[serde(default)]
    pub title: String,
}

/// How a search hit was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MatchType {
    /// Vector similarity.
    Embedding,
    /// Keyword match.
    Keywords,
    /// Chunk adjacent to a hit.
    NearbyChunk,
    /// Conversation history.
    History,
    /// Parent of a hit in hierarchical chunking.
    ParentChunk,
    /// Chunk linked by a relation.
    RelationChunk,
    /// Knowledge graph traversal.
    Graph,
    /// A code this runtime does not know.
    Other(i32),
}

impl MatchType {
    /// Human-readable label.
    pub fn label(&self) -> String {
        match self {
            MatchType::Embedding => "vector match".to_string(),
            MatchType::Keywords => "keyword match".to_string(),
            MatchType::NearbyChunk => "adjacent chunk match".to_string(),
            MatchType::History => "history match".to_string(),
            MatchType::ParentChunk => "parent chunk match".to_string(),
            MatchType::RelationChunk => "relation chunk match".to_string(),
            MatchType::Graph => "graph match".to_string(),
            MatchType::Other(code) => format!("unknown type ({code})"),
        }
    }
}

impl From<i32> for MatchType {
    fn from(code: i32) -> Self {
        match code {
            0 => MatchType::Embedding,
            1 => MatchType::Keywords,
            2 => MatchType::NearbyChunk,
            3 => MatchType::History,
            4 => MatchType::ParentChunk,
            5 => MatchType::RelationChunk,
            6 => MatchType::Graph,
            other => MatchType::Other(other),
        }
    }
}

impl From<MatchType> for i32 {
    fn from(mt: MatchType) -> Self {
        match mt {
            MatchType::Embedding => 0,
            MatchType::Keywords => 1,
            MatchType::NearbyChunk => 2,
            MatchType::History => 3,
            MatchType::ParentChunk => 4,
            MatchType::RelationChunk => 5,
            MatchType::Graph => 6,
            MatchType::Other(code) => code,
        }
    }
}

/// A hit returned by a knowledge base search. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk id.
    pub id: String,
    /// Document the chunk belongs to.
    pub knowledge_id: String,
    /// Title of that document.
    #[serde(default)]
    pub knowledge_title: String,
    /// Chunk text.
    pub content: String,
    /// Relevance score.
    pub score: f64,
    /// How the hit was matched.
    pub match_type: MatchType,
}

/// Parameters of a relevance search against one knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Query text.
    pub query_text: String,
    /// Maximum number of hits.
    pub match_count: usize,
}

/// Chunk kinds produced by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// Body text.
    Text,
    /// Question/answer pair.
    Faq,
    /// Document summary.
    Summary,
    /// Extracted entity.
    Entity,
    /// Extracted relationship.
    Relationship,
    /// OCR text of an image.
    ImageOcr,
    /// Caption of an image.
    ImageCaption,
}

impl ChunkType {
    /// Wire name of the chunk type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Text => "text",
            ChunkType::Faq => "faq",
            ChunkType::Summary => "summary",
            ChunkType::Entity => "entity",
            ChunkType::Relationship => "relationship",
            ChunkType::ImageOcr => "image_ocr",
            ChunkType::ImageCaption => "image_caption",
        }
    }
}

/// A stored chunk of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk id.
    pub id: String,
    /// Owning document.
    pub knowledge_id: String,
    /// Owning knowledge base.
    pub knowledge_base_id: String,
    /// 0-based position within the document.
    pub chunk_index: u64,
    /// Chunk text.
    pub content: String,
    /// Chunk kind.
    pub chunk_type: ChunkType,
    /// Start offset within the source document.
    #[serde(default)]
    pub start_at: u64,
    /// End offset within the source document.
    #[serde(default)]
    pub end_at: u64,
    /// Parent chunk for hierarchical chunking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,
    /// Images attached to the chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageInfo>,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,
    /// Items per page.
    pub page_size: u64,
}

impl Pagination {
    /// The page containing `offset`: `page = offset / limit + 1`.
    /// A zero `limit` is treated as 1.
    pub fn from_offset(offset: u64, limit: u64) -> Self {
        let page_size = limit.max(1);
        Self {
            page: offset / page_size + 1,
            page_size,
        }
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// One page of chunks plus the total across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkPage {
    /// Chunks of the requested page.
    pub items: Vec<Chunk>,
    /// Total matching chunks.
    pub total: u64,
}
