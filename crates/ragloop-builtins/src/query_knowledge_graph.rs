use crate::args::{required_str, string_list};
use crate::report::{write_errors, write_results};
use async_trait::async_trait;
use ragloop_core::payload::GraphQueryData;
use ragloop_core::{RagloopResult, ToolData, ToolResult};
use ragloop_knowledge::{FanoutReport, FanoutRequest, KnowledgeBaseService, MultiSourceSearch};
use ragloop_tools::catalog::QUERY_KNOWLEDGE_GRAPH;
use ragloop_tools::{Tool, ToolContext, ToolDescriptor};
use std::fmt::Write;
use std::sync::Arc;

/// Explores entity relationships across up to ten knowledge bases.
///
/// Sources without graph extraction still get a regular relevance search;
/// the report states which sources have a graph configured.
pub struct QueryKnowledgeGraphTool {
    descriptor: ToolDescriptor,
    engine: MultiSourceSearch,
}

impl QueryKnowledgeGraphTool {
    /// Creates the tool over the given knowledge base service.
    pub fn new(service: Arc<dyn KnowledgeBaseService>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: QUERY_KNOWLEDGE_GRAPH.to_string(),
                description: "Query the knowledge graph to explore relationships between \
                    entities (e.g. \"relationship between Docker and Kubernetes\"). Works best \
                    on knowledge bases with graph extraction configured; others return regular \
                    search results. Results across knowledge bases are deduplicated and sorted \
                    by relevance. Follow up with list_knowledge_chunks for full document content. \
                    Use knowledge_search instead for general text search."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "knowledge_base_ids": {
                            "type": "array",
                            "items": {"type": "string"},
                            "minItems": 1,
                            "maxItems": 10,
                            "description": "Knowledge base IDs to query (1-10)"
                        },
                        "query": {
                            "type": "string",
                            "description": "Entity name, relationship question, or concept to look up"
                        }
                    },
                    "required": ["knowledge_base_ids", "query"]
                }),
            },
            engine: MultiSourceSearch::new(service),
        }
    }
}

#[async_trait]
impl Tool for QueryKnowledgeGraphTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult> {
        let ids = string_list(&arguments, "knowledge_base_ids")?;
        let query = required_str(&arguments, "query")?;
        let request = FanoutRequest::new(&query, &ids)?.with_graph_check();

        let report = self.engine.run(&request, &ctx.cancel).await?;
        let output = render(&report);
        let results = report.retrieved_chunks();

        Ok(ToolResult::with_data(
            output,
            ToolData::GraphQueryResults(GraphQueryData {
                knowledge_base_ids: report.source_ids.clone(),
                query: report.query.clone(),
                count: results.len(),
                results,
                has_graph_config: report.has_graph_config(),
                graph_data: report.graph_projection(),
                kb_counts: report.kb_counts,
                graph_configs: report.graph_configs,
                errors: report.errors,
            }),
        ))
    }
}

fn render(report: &FanoutReport) -> String {
    if report.results.is_empty() {
        let mut out = String::from("No related graph information was found.\n");
        if !report.errors.is_empty() {
            out.push('\n');
            write_errors(&mut out, &report.errors);
        }
        return out;
    }

    let mut out = String::from("=== Knowledge Graph Query ===\n\n");
    let _ = writeln!(out, "📊 Query: {}", report.query);
    let _ = writeln!(out, "🎯 Knowledge bases: {}", report.source_ids.join(", "));
    let _ = writeln!(out, "✓ Found {} related results (deduplicated)\n", report.results.len());

    write_errors(&mut out, &report.errors);

    out.push_str("=== 📈 Graph configuration ===\n\n");
    for (kb_id, config) in &report.graph_configs {
        let _ = writeln!(out, "Knowledge base [{kb_id}]:");
        if config.nodes.is_empty() {
            out.push_str("  ⚠️ Entity types not configured\n");
        } else {
            let _ = writeln!(
                out,
                "  ✓ Entity types ({}): {}",
                config.nodes.len(),
                config.nodes.join(", ")
            );
        }
        if config.relations.is_empty() {
            out.push_str("  ⚠️ Relation types not configured\n");
        } else {
            let _ = writeln!(
                out,
                "  ✓ Relation types ({}): {}",
                config.relations.len(),
                config.relations.join(", ")
            );
        }
        out.push('\n');
    }
    if !report.has_graph_config() {
        out.push_str("⚠️ None of the queried knowledge bases has graph extraction configured\n");
        out.push_str("💡 Configure entity and relation types in the knowledge base settings\n\n");
    }

    if !report.kb_counts.is_empty() {
        out.push_str("=== 📚 Knowledge base coverage ===\n");
        for (kb_id, count) in &report.kb_counts {
            let _ = writeln!(out, "  - {kb_id}: {count} results");
        }
        out.push('\n');
    }

    out.push_str("=== 🔍 Results ===\n\n");
    if report.has_graph_config() {
        out.push_str("💡 Results are based on the configured graph\n\n");
    } else {
        out.push_str("💡 No graph is available, returning related document chunks\n\n");
    }
    write_results(&mut out, &report.results);

    out.push_str("=== 💡 Tips ===\n");
    out.push_str("- ✓ Results are deduplicated across knowledge bases and sorted by relevance\n");
    out.push_str("- ✓ Use list_knowledge_chunks to read the surrounding content\n");
    if !report.has_graph_config() {
        out.push_str("- ⚠️ Configure graph extraction for more precise entity relationships\n");
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ragloop_knowledge::{
        ExtractConfig, GraphRelation, InMemoryKnowledgeStore, KnowledgeBase, MatchType,
        SearchResult,
    };
    use serde_json::json;

    async fn store() -> Arc<InMemoryKnowledgeStore> {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store
            .add_knowledge_base(KnowledgeBase {
                id: "kb1".into(),
                name: "Infra".into(),
                extract_config: Some(ExtractConfig {
                    nodes: vec![],
                    relations: vec![GraphRelation {
                        name: "depends_on".into(),
                        source: "Tool".into(),
                        target: "Tool".into(),
                    }],
                }),
            })
            .await;
        store
            .script_results(
                "kb1",
                vec![SearchResult {
                    id: "c1".into(),
                    knowledge_id: "d1".into(),
                    knowledge_title: "Orchestration".into(),
                    content: "Kubernetes depends on container runtimes".into(),
                    score: 0.82,
                    match_type: MatchType::Graph,
                }],
            )
            .await;
        store
    }

    #[tokio::test]
    async fn test_graph_report() {
        let tool = QueryKnowledgeGraphTool::new(store().await);
        let result = tool
            .execute(
                &ToolContext::new(),
                json!({"knowledge_base_ids": ["kb1"], "query": "kubernetes"}),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("⚠️ Entity types not configured"));
        assert!(result.output.contains("✓ Relation types (1): depends_on"));
        assert!(result.output.contains("【Source document: Orchestration】"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data"]["display_type"], "graph_query_results");
        assert_eq!(json["data"]["has_graph_config"], true);
        assert_eq!(json["data"]["graph_data"]["total_nodes"], 1);
        assert_eq!(json["data"]["results"][0]["match_type"], "graph match");
    }

    #[tokio::test]
    async fn test_structural_errors_fail() {
        let tool = QueryKnowledgeGraphTool::new(store().await);
        let ctx = ToolContext::new();
        assert!(tool
            .execute(&ctx, json!({"knowledge_base_ids": [], "query": "x"}))
            .await
            .is_err());
        assert!(tool
            .execute(&ctx, json!({"knowledge_base_ids": ["kb1"], "query": "  "}))
            .await
            .is_err());
        assert!(tool
            .execute(&ctx, json!({"knowledge_base_ids": "kb1", "query": "x"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_no_results_is_success() {
        let tool = QueryKnowledgeGraphTool::new(store().await);
        let result = tool
            .execute(
                &ToolContext::new(),
                json!({"knowledge_base_ids": ["unknown"], "query": "x"}),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("No related graph information"));
        assert!(result.output.contains("KB unknown"));
    }
}
