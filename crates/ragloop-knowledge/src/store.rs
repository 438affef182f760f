use crate::service::{ChunkService, KnowledgeBaseService, KnowledgeService};
use crate::types::{
    Chunk, ChunkPage, ChunkType, Knowledge, KnowledgeBase, MatchType, Pagination, SearchParams,
    SearchResult,
};
use async_trait::async_trait;
use ragloop_core::{RagloopError, RagloopResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Serialized contents of an [`InMemoryKnowledgeStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeFixture {
    /// Knowledge bases, in listing order.
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBase>,
    /// Documents.
    #[serde(default)]
    pub documents: Vec<Knowledge>,
    /// Chunks of all documents.
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

#[derive(Default)]
struct StoreState {
    bases: Vec<KnowledgeBase>,
    documents: HashMap<String, Knowledge>,
    chunks: Vec<Chunk>,
    scripted: HashMap<String, Vec<SearchResult>>,
    failures: HashMap<String, String>,
    latency: HashMap<String, Duration>,
}

/// In-memory implementation of all knowledge collaborator traits.
///
/// Search scores chunks by the fraction of query terms they contain. Tests
/// can script per-source results, inject per-source failures, and add
/// per-source latency.
pub struct InMemoryKnowledgeStore {
    state: RwLock<StoreState>,
}

impl InMemoryKnowledgeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Builds a store from fixture data.
    pub fn from_fixture(fixture: KnowledgeFixture) -> Self {
        let state = StoreState {
            bases: fixture.knowledge_bases,
            documents: fixture
                .documents
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
            chunks: fixture.chunks,
            ..Default::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Loads a JSON fixture file.
    pub async fn load_fixture(path: impl AsRef<Path>) -> RagloopResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path).await.map_err(|e| {
            RagloopError::Config(format!("failed to read fixture {}: {e}", path.display()))
        })?;
        let fixture: KnowledgeFixture = serde_json::from_str(&data)?;
        debug!(
            path = %path.display(),
            knowledge_bases = fixture.knowledge_bases.len(),
            chunks = fixture.chunks.len(),
            "Loaded knowledge fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    /// Adds or replaces a knowledge base.
    pub async fn add_knowledge_base(&self, kb: KnowledgeBase) {
        let mut state = self.state.write().await;
        state.bases.retain(|b| b.id != kb.id);
        state.bases.push(kb);
    }

    /// Adds or replaces a document.
    pub async fn add_document(&self, doc: Knowledge) {
        self.state.write().await.documents.insert(doc.id.clone(), doc);
    }

    /// Adds a chunk.
    pub async fn add_chunk(&self, chunk: Chunk) {
        self.state.write().await.chunks.push(chunk);
    }

    /// Makes `hybrid_search` on this source return exactly `results`
    /// (truncated to the requested match count).
    pub async fn script_results(&self, kb_id: impl Into<String>, results: Vec<SearchResult>) {
        self.state.write().await.scripted.insert(kb_id.into(), results);
    }

    /// Makes `hybrid_search` on this source fail with `message`.
    pub async fn fail_source(&self, kb_id: impl Into<String>, message: impl Into<String>) {
        self.state
            .write()
            .await
            .failures
            .insert(kb_id.into(), message.into());
    }

    /// Delays `hybrid_search` on this source.
    pub async fn set_latency(&self, kb_id: impl Into<String>, latency: Duration) {
        self.state.write().await.latency.insert(kb_id.into(), latency);
    }

    /// Knowledge bases in insertion order.
    pub async fn knowledge_bases(&self) -> Vec<KnowledgeBase> {
        self.state.read().await.bases.clone()
    }

    fn keyword_search(state: &StoreState, kb_id: &str, params: &SearchParams) -> Vec<SearchResult> {
        let terms: Vec<String> = params
            .query_text
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(u64, SearchResult)> = state
            .chunks
            .iter()
            .filter(|c| c.knowledge_base_id == kb_id)
            .filter_map(|c| {
                let content = c.content.to_lowercase();
                let matched = terms.iter().filter(|t| content.contains(t.as_str())).count();
                if matched == 0 {
                    return None;
                }
                let title = state
                    .documents
                    .get(&c.knowledge_id)
                    .map(|d| d.title.clone())
                    .unwrap_or_default();
                Some((
                    c.chunk_index,
                    SearchResult {
                        id: c.id.clone(),
                        knowledge_id: c.knowledge_id.clone(),
                        knowledge_title: title,
                        content: c.content.clone(),
                        score: matched as f64 / terms.len() as f64,
                        match_type: MatchType::Keywords,
                    },
                ))
            })
            .collect();

        hits.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
        hits.into_iter()
            .take(params.match_count)
            .map(|(_, r)| r)
            .collect()
    }
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeBaseService for InMemoryKnowledgeStore {
    async fn get_knowledge_base(&self, id: &str) -> RagloopResult<KnowledgeBase> {
        let state = self.state.read().await;
        state
            .bases
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| RagloopError::NotFound(format!("knowledge base {id}")))
    }

    async fn hybrid_search(
        &self,
        knowledge_base_id: &str,
        params: &SearchParams,
    ) -> RagloopResult<Vec<SearchResult>> {
        let latency = self.state.read().await.latency.get(knowledge_base_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().await;
        if let Some(message) = state.failures.get(knowledge_base_id) {
            return Err(RagloopError::Knowledge(message.clone()));
        }
        if !state.bases.iter().any(|b| b.id == knowledge_base_id) {
            return Err(RagloopError::NotFound(format!(
                "knowledge base {knowledge_base_id}"
            )));
        }
        if let Some(results) = state.scripted.get(knowledge_base_id) {
            return Ok(results.iter().take(params.match_count).cloned().collect());
        }
        Ok(Self::keyword_search(&state, knowledge_base_id, params))
    }
}

#[async_trait]
impl ChunkService for InMemoryKnowledgeStore {
    async fn list_paged_chunks(
        &self,
        knowledge_id: &str,
        pagination: Pagination,
        chunk_types: &[ChunkType],
    ) -> RagloopResult<ChunkPage> {
        let state = self.state.read().await;
        if !state.documents.contains_key(knowledge_id) {
            return Err(RagloopError::NotFound(format!("knowledge {knowledge_id}")));
        }

        let mut matching: Vec<&Chunk> = state
            .chunks
            .iter()
            .filter(|c| c.knowledge_id == knowledge_id)
            .filter(|c| chunk_types.is_empty() || chunk_types.contains(&c.chunk_type))
            .collect();
        matching.sort_by_key(|c| c.chunk_index);

        let total = matching.len() as u64;
        let skip = usize::try_from(pagination.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(pagination.page_size).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(skip).take(take).cloned().collect();
        Ok(ChunkPage { items, total })
    }
}

#[async_trait]
impl KnowledgeService for InMemoryKnowledgeStore {
    async fn get_knowledge(&self, id: &str) -> RagloopResult<Knowledge> {
        self.state
            .read()
            .await
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| RagloopError::NotFound(format!("knowledge {id}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn chunk(id: &str, doc: &str, index: u64, content: &str, chunk_type: ChunkType) -> Chunk {
        Chunk {
            id: id.into(),
            knowledge_id: doc.into(),
            knowledge_base_id: "kb1".into(),
            chunk_index: index,
            content: content.into(),
            chunk_type,
            start_at: 0,
            end_at: content.len() as u64,
            parent_chunk_id: None,
            images: Vec::new(),
        }
    }

    async fn seeded() -> InMemoryKnowledgeStore {
        let store = InMemoryKnowledgeStore::new();
        store
            .add_knowledge_base(KnowledgeBase {
                id: "kb1".into(),
                name: "Ops".into(),
                extract_config: None,
            })
            .await;
        store
            .add_document(Knowledge {
                id: "doc1".into(),
                knowledge_base_id: "kb1".into(),
                title: "Containers".into(),
            })
            .await;
        store
            .add_chunk(chunk("c0", "doc1", 0, "Docker builds images", ChunkType::Text))
            .await;
        store
            .add_chunk(chunk("c1", "doc1", 1, "Kubernetes schedules Docker pods", ChunkType::Text))
            .await;
        store
            .add_chunk(chunk("c2", "doc1", 2, "summary of docker", ChunkType::Summary))
            .await;
        store
    }

    #[tokio::test]
    async fn test_keyword_search_scores_by_term_fraction() {
        let store = seeded().await;
        let params = SearchParams {
            query_text: "docker kubernetes".into(),
            match_count: 10,
        };
        let results = store.hybrid_search("kb1", &params).await.unwrap();
        assert_eq!(results[0].id, "c1");
        assert!((results[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(results[0].knowledge_title, "Containers");
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_injected_failure_and_unknown_source() {
        let store = seeded().await;
        let params = SearchParams {
            query_text: "docker".into(),
            match_count: 10,
        };
        store.fail_source("kb1", "index offline").await;
        let err = store.hybrid_search("kb1", &params).await.unwrap_err();
        assert!(err.to_string().contains("index offline"));
        let err = store.hybrid_search("kb9", &params).await.unwrap_err();
        assert!(matches!(err, RagloopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_types_and_distinguishes_not_found() {
        let store = seeded().await;
        let page = store
            .list_paged_chunks(
                "doc1",
                Pagination::from_offset(0, 20),
                &[ChunkType::Text, ChunkType::Faq],
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[1].id, "c1");

        let err = store
            .list_paged_chunks("nope", Pagination::from_offset(0, 20), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RagloopError::NotFound(_)));
    }
}
