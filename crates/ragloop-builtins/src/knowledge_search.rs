use crate::args::{optional_int, required_str, string_list};
use crate::report::{write_errors, write_results};
use async_trait::async_trait;
use ragloop_core::payload::SearchData;
use ragloop_core::{RagloopResult, ToolData, ToolResult};
use ragloop_knowledge::fanout::DEFAULT_TOP_K;
use ragloop_knowledge::{FanoutReport, FanoutRequest, KnowledgeBaseService, MultiSourceSearch};
use ragloop_tools::catalog::KNOWLEDGE_SEARCH;
use ragloop_tools::{Tool, ToolContext, ToolDescriptor};
use std::fmt::Write;
use std::sync::Arc;

/// Largest `top_k` a caller may request.
pub const MAX_TOP_K: i64 = 20;

/// Semantic search across several knowledge bases.
///
/// When the call names no knowledge bases, the session's configured ones are
/// searched.
pub struct KnowledgeSearchTool {
    descriptor: ToolDescriptor,
    engine: MultiSourceSearch,
    default_knowledge_base_ids: Vec<String>,
}

impl KnowledgeSearchTool {
    /// Creates the tool.
    pub fn new(
        service: Arc<dyn KnowledgeBaseService>,
        default_knowledge_base_ids: Vec<String>,
    ) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: KNOWLEDGE_SEARCH.to_string(),
                description: "Semantic search over knowledge bases. Understands the question \
                    and returns the most relevant chunks, deduplicated across knowledge bases \
                    and sorted by relevance. Use list_knowledge_chunks afterwards to read a \
                    matching document in full."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The question or topic to search for"
                        },
                        "knowledge_base_ids": {
                            "type": "array",
                            "items": {"type": "string"},
                            "maxItems": 10,
                            "description": "Knowledge base IDs to search; defaults to the session's knowledge bases"
                        },
                        "top_k": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": MAX_TOP_K,
                            "default": DEFAULT_TOP_K,
                            "description": "Results per knowledge base"
                        }
                    },
                    "required": ["query"]
                }),
            },
            engine: MultiSourceSearch::new(service),
            default_knowledge_base_ids,
        }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult> {
        let query = required_str(&arguments, "query")?;
        let mut ids = string_list(&arguments, "knowledge_base_ids")?;
        if ids.is_empty() {
            ids.clone_from(&self.default_knowledge_base_ids);
        }
        let top_k = optional_int(&arguments, "top_k")?
            .map_or(DEFAULT_TOP_K, |k| k.clamp(1, MAX_TOP_K) as usize);

        let request = FanoutRequest::new(&query, &ids)?.with_top_k(top_k);
        let report = self.engine.run(&request, &ctx.cancel).await?;
        let output = render(&report);
        let results = report.retrieved_chunks();

        Ok(ToolResult::with_data(
            output,
            ToolData::SearchResults(SearchData {
                knowledge_base_ids: report.source_ids,
                query: report.query,
                count: results.len(),
                results,
                kb_counts: report.kb_counts,
                errors: report.errors,
            }),
        ))
    }
}

fn render(report: &FanoutReport) -> String {
    let mut out = String::from("=== Knowledge Search ===\n\n");
    let _ = writeln!(out, "🔍 Query: {}", report.query);
    let _ = writeln!(out, "🎯 Knowledge bases: {}", report.source_ids.join(", "));

    if report.results.is_empty() {
        out.push_str("No relevant content was found. Try different keywords, or query_knowledge_graph for related entities.\n\n");
        write_errors(&mut out, &report.errors);
        return out;
    }

    let _ = writeln!(out, "✓ Found {} results (deduplicated)\n", report.results.len());
    write_errors(&mut out, &report.errors);
    write_results(&mut out, &report.results);
    out.push_str("💡 Use list_knowledge_chunks with a knowledge_id to read the full document.\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ragloop_knowledge::{Chunk, ChunkType, InMemoryKnowledgeStore, Knowledge, KnowledgeBase};
    use serde_json::json;

    async fn store() -> Arc<InMemoryKnowledgeStore> {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        for kb in ["kb1", "kb2"] {
            store
                .add_knowledge_base(KnowledgeBase {
                    id: kb.into(),
                    name: kb.into(),
                    extract_config: None,
                })
                .await;
            store
                .add_document(Knowledge {
                    id: format!("{kb}-doc"),
                    knowledge_base_id: kb.into(),
                    title: format!("{kb} handbook"),
                })
                .await;
            for i in 0..30u64 {
                store
                    .add_chunk(Chunk {
                        id: format!("{kb}-c{i}"),
                        knowledge_id: format!("{kb}-doc"),
                        knowledge_base_id: kb.into(),
                        chunk_index: i,
                        content: format!("rust ownership note {i}"),
                        chunk_type: ChunkType::Text,
                        start_at: 0,
                        end_at: 0,
                        parent_chunk_id: None,
                        images: vec![],
                    })
                    .await;
            }
        }
        store
    }

    #[tokio::test]
    async fn test_defaults_to_session_knowledge_bases() {
        let tool = KnowledgeSearchTool::new(store().await, vec!["kb2".into()]);
        let result = tool
            .execute(&ToolContext::new(), json!({"query": "ownership"}))
            .await
            .unwrap();
        match result.data.unwrap() {
            ToolData::SearchResults(data) => {
                assert_eq!(data.knowledge_base_ids, vec!["kb2"]);
                assert_eq!(data.count, DEFAULT_TOP_K);
                assert!(data.results.iter().all(|r| r.knowledge_id == "kb2-doc"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_top_k_is_clamped() {
        let tool = KnowledgeSearchTool::new(store().await, vec![]);
        let result = tool
            .execute(
                &ToolContext::new(),
                json!({"query": "rust", "knowledge_base_ids": ["kb1"], "top_k": 500}),
            )
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data"]["count"], 20);
        assert_eq!(json["data"]["display_type"], "search_results");
    }

    #[tokio::test]
    async fn test_no_ids_anywhere_is_invalid() {
        let tool = KnowledgeSearchTool::new(store().await, vec![]);
        let err = tool
            .execute(&ToolContext::new(), json!({"query": "rust"}))
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }
}
