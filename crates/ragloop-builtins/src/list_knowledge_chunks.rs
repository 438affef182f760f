use crate::args::{optional_int, required_str};
use async_trait::async_trait;
use ragloop_core::payload::{ChunkListData, ListedChunk};
use ragloop_core::{RagloopError, RagloopResult, ToolData, ToolResult};
use ragloop_knowledge::{Chunk, ChunkService, ChunkType, KnowledgeService, Pagination};
use ragloop_tools::catalog::LIST_KNOWLEDGE_CHUNKS;
use ragloop_tools::{Tool, ToolContext, ToolDescriptor};
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

/// Page size when the call does not give one.
pub const DEFAULT_LIMIT: u64 = 20;
/// Largest page size.
pub const MAX_LIMIT: u64 = 100;

/// Chunk kinds the tool lists.
const LISTED_TYPES: [ChunkType; 2] = [ChunkType::Text, ChunkType::Faq];

/// Pages through the chunks of one document.
pub struct ListKnowledgeChunksTool {
    descriptor: ToolDescriptor,
    chunks: Arc<dyn ChunkService>,
    documents: Arc<dyn KnowledgeService>,
}

impl ListKnowledgeChunksTool {
    /// Creates the tool.
    pub fn new(chunks: Arc<dyn ChunkService>, documents: Arc<dyn KnowledgeService>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: LIST_KNOWLEDGE_CHUNKS.to_string(),
                description: "Retrieve the full chunk content of a document by knowledge_id. \
                    Use it after knowledge_search or query_knowledge_graph found a relevant document, to \
                    read its content in order, see context around a hit, or check how many \
                    chunks it has. Returns chunk_id, chunk_index and text for each chunk."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "knowledge_id": {
                            "type": "string",
                            "description": "Document ID to retrieve chunks from"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Chunks per page (default 20, max 100)",
                            "default": DEFAULT_LIMIT,
                            "minimum": 1,
                            "maximum": MAX_LIMIT
                        },
                        "offset": {
                            "type": "integer",
                            "description": "Start position (default 0)",
                            "default": 0,
                            "minimum": 0
                        }
                    },
                    "required": ["knowledge_id"]
                }),
            },
            chunks,
            documents,
        }
    }

    async fn lookup_title(&self, knowledge_id: &str) -> String {
        match self.documents.get_knowledge(knowledge_id).await {
            Ok(doc) => doc.title.trim().to_string(),
            Err(e) => {
                debug!(knowledge_id, error = %e, "Document title lookup failed");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Tool for ListKnowledgeChunksTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> RagloopResult<ToolResult> {
        let knowledge_id = required_str(&arguments, "knowledge_id")?;
        let limit = optional_int(&arguments, "limit")?
            .map_or(DEFAULT_LIMIT, |l| l.clamp(1, MAX_LIMIT as i64) as u64);
        let offset = optional_int(&arguments, "offset")?.map_or(0, |o| o.max(0) as u64);
        let pagination = Pagination::from_offset(offset, limit);

        if ctx.cancel.is_cancelled() {
            return Err(RagloopError::Cancelled);
        }

        let page = match self
            .chunks
            .list_paged_chunks(&knowledge_id, pagination, &LISTED_TYPES)
            .await
        {
            Ok(page) => page,
            Err(RagloopError::NotFound(_)) => {
                return Ok(ToolResult::failure(
                    format!("Knowledge document not found: {knowledge_id}"),
                    "Verify the knowledge_id. Use knowledge_search or query_knowledge_graph to find valid document IDs.",
                ));
            }
            Err(RagloopError::Cancelled) => return Err(RagloopError::Cancelled),
            Err(e) => {
                return Ok(ToolResult::failure(
                    format!("Failed to list chunks: {e}"),
                    "The chunk service is unavailable. Try again later or use knowledge_search.",
                ));
            }
        };

        let title = self.lookup_title(&knowledge_id).await;
        let start = pagination.skip();
        let fetched = page.items.len();
        let end = start + fetched as u64;
        let next_offset = (end < page.total).then_some(end);
        let output = render(&knowledge_id, &title, page.total, &page.items, next_offset);

        let chunks = page
            .items
            .into_iter()
            .enumerate()
            .map(|(i, c)| ListedChunk {
                seq: i + 1,
                chunk_type: c.chunk_type.as_str().to_string(),
                images: c.images.into_iter().filter(|img| !img.is_empty()).collect(),
                chunk_id: c.id,
                chunk_index: c.chunk_index,
                content: c.content,
                knowledge_id: c.knowledge_id,
                knowledge_base_id: c.knowledge_base_id,
                start_at: c.start_at,
                end_at: c.end_at,
                parent_chunk_id: c.parent_chunk_id,
            })
            .collect();

        Ok(ToolResult::with_data(
            output,
            ToolData::ChunkList(ChunkListData {
                knowledge_id,
                knowledge_title: title,
                total_chunks: page.total,
                fetched_chunks: fetched,
                page: pagination.page,
                page_size: pagination.page_size,
                offset: start,
                next_offset,
                chunks,
            }),
        ))
    }
}

fn render(
    knowledge_id: &str,
    title: &str,
    total: u64,
    chunks: &[Chunk],
    next_offset: Option<u64>,
) -> String {
    let mut out = String::from("=== Document Chunks ===\n\n");
    if title.is_empty() {
        let _ = writeln!(out, "Document ID: {knowledge_id}");
    } else {
        let _ = writeln!(out, "Document: {title} ({knowledge_id})");
    }
    let _ = writeln!(out, "Total chunks: {total}");

    let (Some(first), Some(last)) = (chunks.first(), chunks.last()) else {
        if total == 0 {
            out.push_str("No chunks found. The document may not be parsed yet; check that parsing has completed.\n");
        } else {
            let _ = writeln!(
                out,
                "The document has {total} chunks but this page is empty. Adjust offset to a value below {total}."
            );
        }
        return out;
    };

    let _ = writeln!(
        out,
        "Fetched: {} chunks, index range: {} - {}\n",
        chunks.len(),
        first.chunk_index,
        last.chunk_index
    );

    out.push_str("=== Chunk content ===\n\n");
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = writeln!(out, "Chunk #{} (Index {})", i + 1, chunk.chunk_index + 1);
        let _ = writeln!(out, "  chunk_id: {}", chunk.id);
        let _ = writeln!(out, "  Type: {}", chunk.chunk_type.as_str());
        let content = chunk.content.trim();
        let _ = writeln!(
            out,
            "  Content: {}",
            if content.is_empty() { "(empty)" } else { content }
        );

        let images: Vec<_> = chunk.images.iter().filter(|img| !img.is_empty()).collect();
        if !images.is_empty() {
            let _ = writeln!(out, "  Images ({}):", images.len());
            for (n, img) in images.iter().enumerate() {
                let _ = writeln!(out, "    Image {}:", n + 1);
                if !img.url.is_empty() {
                    let _ = writeln!(out, "      URL: {}", img.url);
                }
                if !img.caption.is_empty() {
                    let _ = writeln!(out, "      Caption: {}", img.caption);
                }
                if !img.ocr_text.is_empty() {
                    let _ = writeln!(out, "      OCR text: {}", img.ocr_text);
                }
            }
        }
        out.push('\n');
    }

    if let Some(next) = next_offset {
        let _ = writeln!(
            out,
            "Note: more chunks remain. Call again with offset={next} to continue."
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ragloop_knowledge::{ImageInfo, InMemoryKnowledgeStore, Knowledge};
    use serde_json::json;

    async fn store(n: u64) -> Arc<InMemoryKnowledgeStore> {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        store
            .add_document(Knowledge {
                id: "doc".into(),
                knowledge_base_id: "kb".into(),
                title: " Manual ".into(),
            })
            .await;
        for i in 0..n {
            store
                .add_chunk(Chunk {
                    id: format!("c{i}"),
                    knowledge_id: "doc".into(),
                    knowledge_base_id: "kb".into(),
                    chunk_index: i,
                    content: format!("part {i}"),
                    chunk_type: ChunkType::Text,
                    start_at: i * 10,
                    end_at: i * 10 + 9,
                    parent_chunk_id: None,
                    images: if i == 0 {
                        vec![
                            ImageInfo {
                                url: "https://img/1.png".into(),
                                caption: "diagram".into(),
                                ocr_text: String::new(),
                            },
                            ImageInfo::default(),
                        ]
                    } else {
                        vec![]
                    },
                })
                .await;
        }
        store
    }

    fn tool(store: Arc<InMemoryKnowledgeStore>) -> ListKnowledgeChunksTool {
        ListKnowledgeChunksTool::new(store.clone(), store)
    }

    fn data(result: &ToolResult) -> &ChunkListData {
        match result.data.as_ref().unwrap() {
            ToolData::ChunkList(d) => d,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_page_with_continuation() {
        let result = tool(store(35).await)
            .execute(&ToolContext::new(), json!({"knowledge_id": "doc"}))
            .await
            .unwrap();
        let d = data(&result);
        assert_eq!(d.knowledge_title, "Manual");
        assert_eq!(d.total_chunks, 35);
        assert_eq!(d.fetched_chunks, 20);
        assert_eq!(d.page, 1);
        assert_eq!(d.next_offset, Some(20));
        assert_eq!(d.chunks[0].images.len(), 1);
        assert!(result.output.contains("Document: Manual (doc)"));
        assert!(result.output.contains("index range: 0 - 19"));
        assert!(result.output.contains("offset=20"));
        assert!(result.output.contains("Caption: diagram"));
    }

    #[tokio::test]
    async fn test_limit_and_offset_are_clamped() {
        let result = tool(store(5).await)
            .execute(
                &ToolContext::new(),
                json!({"knowledge_id": "doc", "limit": 1000, "offset": -4}),
            )
            .await
            .unwrap();
        let d = data(&result);
        assert_eq!(d.page_size, MAX_LIMIT);
        assert_eq!(d.offset, 0);
        assert_eq!(d.next_offset, None);
        assert!(!result.output.contains("more chunks remain"));
    }

    #[tokio::test]
    async fn test_empty_page_and_empty_document_guidance() {
        let past_end = tool(store(5).await)
            .execute(&ToolContext::new(), json!({"knowledge_id": "doc", "offset": 40}))
            .await
            .unwrap();
        assert!(past_end.success);
        assert!(past_end.output.contains("Adjust offset"));

        let unparsed = tool(store(0).await)
            .execute(&ToolContext::new(), json!({"knowledge_id": "doc"}))
            .await
            .unwrap();
        assert!(unparsed.success);
        assert!(unparsed.output.contains("may not be parsed"));
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let result = tool(store(3).await)
            .execute(&ToolContext::new(), json!({"knowledge_id": "ghost"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error_message().contains("not found: ghost"));
    }
}
