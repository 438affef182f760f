//! Structured payloads carried in [`crate::ToolResult::data`].
//!
//! Each built-in tool has its own payload shape; [`ToolData`] ties them
//! together behind one envelope, tagged by `display_type` so UI consumers can
//! pick a renderer without knowing which tool produced the data.

use crate::plan::{PlanCounts, PlanStep};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tagged union of every tool payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "display_type", rename_all = "snake_case")]
pub enum ToolData {
    /// Plan snapshot written by `todo_write`.
    Plan(PlanData),
    /// Reasoning step recorded by `thinking`.
    Thinking(ThinkingData),
    /// Multi-source graph query results.
    GraphQueryResults(GraphQueryData),
    /// Multi-source semantic search results.
    SearchResults(SearchData),
    /// One page of a document's chunks.
    ChunkList(ChunkListData),
    /// Free-form payload for tools registered outside this workspace.
    Custom(serde_json::Map<String, serde_json::Value>),
}

impl ToolData {
    /// The `display_type` tag of this payload.
    pub fn display_type(&self) -> &'static str {
        match self {
            ToolData::Plan(_) => "plan",
            ToolData::Thinking(_) => "thinking",
            ToolData::GraphQueryResults(_) => "graph_query_results",
            ToolData::SearchResults(_) => "search_results",
            ToolData::ChunkList(_) => "chunk_list",
            ToolData::Custom(_) => "custom",
        }
    }
}

/// Payload of the plan tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanData {
    /// The task being planned.
    pub task: String,
    /// The full step list, in the order the model supplied it.
    pub steps: Vec<PlanStep>,
    /// Per-status totals.
    pub counts: PlanCounts,
    /// Pending plus in-progress steps.
    pub remaining: usize,
    /// Always true; lets consumers distinguish a written plan from guidance.
    pub plan_created: bool,
}

/// Payload of the thinking tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingData {
    /// The recorded thought.
    pub thought: String,
    /// 1-based position of this thought.
    pub thought_number: u32,
    /// Current estimate of the total number of thoughts.
    pub total_thoughts: u32,
    /// Whether the model intends to keep thinking.
    pub next_thought_needed: bool,
}

/// A ranked retrieval hit as exposed to programmatic consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// 1-based rank after merge and sort.
    pub result_index: usize,
    /// Content chunk identifier (dedup identity).
    pub chunk_id: String,
    /// Chunk text.
    pub content: String,
    /// Relevance score reported by the search backend.
    pub score: f64,
    /// Discretized relevance label.
    pub relevance_level: String,
    /// Document the chunk belongs to.
    pub knowledge_id: String,
    /// Title of that document.
    pub knowledge_title: String,
    /// Human-readable match type label.
    pub match_type: String,
}

/// A knowledge source that failed during fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    /// The failing knowledge base.
    pub knowledge_base_id: String,
    /// What went wrong.
    pub message: String,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KB {}: {}", self.knowledge_base_id, self.message)
    }
}

/// Entity and relation type names configured for graph extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfigSummary {
    /// Entity type names.
    pub nodes: Vec<String>,
    /// Relation type names.
    pub relations: Vec<String>,
}

/// Node of the graph visualization projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNodeView {
    /// Chunk id.
    pub id: String,
    /// Display label (`Chunk N`).
    pub label: String,
    /// Chunk text.
    pub content: String,
    /// Owning document id.
    pub kb_id: String,
    /// Owning document title.
    pub kb_title: String,
    /// Relevance score.
    pub score: f64,
    /// Node kind; currently always `chunk`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Edge of the graph visualization projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdgeView {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relation name.
    pub label: String,
}

/// Graph projection for visualization. `edges` is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    /// One node per unique result.
    pub nodes: Vec<GraphNodeView>,
    /// Relationship edges; empty until a relationship graph backs the query.
    pub edges: Vec<GraphEdgeView>,
    /// `nodes.len()`.
    pub total_nodes: usize,
    /// `edges.len()`.
    pub total_edges: usize,
}

/// Payload of the knowledge graph query tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQueryData {
    /// Knowledge bases queried, in caller order.
    pub knowledge_base_ids: Vec<String>,
    /// Query text.
    pub query: String,
    /// Deduplicated, ranked results.
    pub results: Vec<RetrievedChunk>,
    /// `results.len()`.
    pub count: usize,
    /// Raw result count per knowledge base (before dedup).
    pub kb_counts: BTreeMap<String, usize>,
    /// Graph configuration per knowledge base that has one.
    pub graph_configs: BTreeMap<String, GraphConfigSummary>,
    /// Whether any queried knowledge base has graph extraction configured.
    pub has_graph_config: bool,
    /// Visualization projection.
    pub graph_data: GraphProjection,
    /// Per-source failures.
    pub errors: Vec<SourceError>,
}

/// Payload of the multi-source semantic search tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchData {
    /// Knowledge bases queried, in caller order.
    pub knowledge_base_ids: Vec<String>,
    /// Query text.
    pub query: String,
    /// Deduplicated, ranked results.
    pub results: Vec<RetrievedChunk>,
    /// `results.len()`.
    pub count: usize,
    /// Raw result count per knowledge base (before dedup).
    pub kb_counts: BTreeMap<String, usize>,
    /// Per-source failures.
    pub errors: Vec<SourceError>,
}

/// An image attached to a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Image location.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Caption produced during ingestion.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caption: String,
    /// OCR text extracted from the image.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ocr_text: String,
}

impl ImageInfo {
    /// Whether the image carries no usable information.
    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.caption.is_empty() && self.ocr_text.is_empty()
    }
}

/// A chunk as listed by the paged listing tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedChunk {
    /// 1-based position within this page.
    pub seq: usize,
    /// Chunk id.
    pub chunk_id: String,
    /// 0-based index of the chunk within its document.
    pub chunk_index: u64,
    /// Chunk text.
    pub content: String,
    /// Chunk type name.
    pub chunk_type: String,
    /// Owning document.
    pub knowledge_id: String,
    /// Owning knowledge base.
    pub knowledge_base_id: String,
    /// Start offset within the source document.
    pub start_at: u64,
    /// End offset within the source document.
    pub end_at: u64,
    /// Parent chunk, for hierarchical chunking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,
    /// Non-empty images attached to the chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageInfo>,
}

/// Payload of the paged listing tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkListData {
    /// Document id.
    pub knowledge_id: String,
    /// Document title, empty when unknown.
    pub knowledge_title: String,
    /// Total chunks in the document.
    pub total_chunks: u64,
    /// Chunks returned by this call.
    pub fetched_chunks: usize,
    /// 1-based page requested from the chunk service.
    pub page: u64,
    /// Page size requested from the chunk service.
    pub page_size: u64,
    /// Position of the first chunk of the returned page.
    pub offset: u64,
    /// Offset to request next, when more chunks remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
    /// The chunks of this page.
    pub chunks: Vec<ListedChunk>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_type_tag_is_serialized() {
        let data = ToolData::Thinking(ThinkingData {
            thought: "check KB first".into(),
            thought_number: 1,
            total_thoughts: 3,
            next_thought_needed: true,
        });
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["display_type"], "thinking");
        assert_eq!(json["thought"], "check KB first");
        assert_eq!(data.display_type(), "thinking");
    }

    #[test]
    fn test_graph_projection_always_has_edges() {
        let json = serde_json::to_value(GraphProjection::default()).unwrap();
        assert!(json["edges"].as_array().unwrap().is_empty());
        assert_eq!(json["total_edges"], 0);
    }

    #[test]
    fn test_custom_payload_roundtrip() {
        let mut map = serde_json::Map::new();
        map.insert("rows".into(), serde_json::json!(3));
        let data = ToolData::Custom(map);
        let json = serde_json::to_string(&data).unwrap();
        let back: ToolData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
