//! Concurrent multi-source search with partial-failure tolerance.
//!
//! One task per knowledge source runs inside a [`JoinSet`]; every task writes
//! its outcome into a single per-call accumulator. Merging starts only after
//! all tasks have joined, and walks the sources in caller order, so the output
//! depends on results and source order alone, never on completion timing.

use crate::relevance::relevance_label;
use crate::service::KnowledgeBaseService;
use crate::types::{KnowledgeBase, SearchParams, SearchResult};
use parking_lot::Mutex;
use ragloop_core::payload::{
    GraphConfigSummary, GraphNodeView, GraphProjection, RetrievedChunk, SourceError,
};
use ragloop_core::{RagloopError, RagloopResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maximum number of sources one query may fan out to.
pub const MAX_SOURCES: usize = 10;

/// Hits requested from each source.
pub const DEFAULT_TOP_K: usize = 10;

/// A validated fan-out request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutRequest {
    /// Trimmed, non-empty query text.
    pub query: String,
    /// 1 to [`MAX_SOURCES`] distinct source ids, in caller order.
    pub source_ids: Vec<String>,
    /// Hits requested from each source.
    pub top_k: usize,
    /// Whether to inspect each source's graph capability flag.
    pub check_graph: bool,
}

impl FanoutRequest {
    /// Validates raw inputs. Blank ids are dropped and duplicates collapse to
    /// their first occurrence before the count is checked.
    pub fn new(query: &str, source_ids: &[String]) -> RagloopResult<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagloopError::InvalidArguments("query is required".into()));
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = source_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();

        if ids.is_empty() {
            return Err(RagloopError::InvalidArguments(
                "knowledge_base_ids is required and must be a non-empty array".into(),
            ));
        }
        if ids.len() > MAX_SOURCES {
            return Err(RagloopError::InvalidArguments(format!(
                "knowledge_base_ids must contain at most {MAX_SOURCES} ids, got {}",
                ids.len()
            )));
        }

        Ok(Self {
            query: query.to_string(),
            source_ids: ids,
            top_k: DEFAULT_TOP_K,
            check_graph: false,
        })
    }

    /// Sets the per-source hit count.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Enables the graph capability check.
    pub fn with_graph_check(mut self) -> Self {
        self.check_graph = true;
        self
    }
}

/// Outcome of one source's unit of work.
#[derive(Debug, Clone)]
enum SourceOutcome {
    Succeeded {
        kb: KnowledgeBase,
        results: Vec<SearchResult>,
    },
    Failed {
        message: String,
    },
}

/// Merged output of a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct FanoutReport {
    /// The query that was run.
    pub query: String,
    /// Sources queried, in caller order.
    pub source_ids: Vec<String>,
    /// Deduplicated results, sorted by descending score (stable).
    pub results: Vec<SearchResult>,
    /// Raw hit count per successful source, before dedup.
    pub kb_counts: BTreeMap<String, usize>,
    /// Graph configuration of each successful source that has one.
    pub graph_configs: BTreeMap<String, GraphConfigSummary>,
    /// Failed sources, in caller order.
    pub errors: Vec<SourceError>,
}

impl FanoutReport {
    /// Whether any successful source has graph extraction configured.
    pub fn has_graph_config(&self) -> bool {
        !self.graph_configs.is_empty()
    }

    /// Results as ranked payload entries (1-based `result_index`).
    pub fn retrieved_chunks(&self) -> Vec<RetrievedChunk> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, r)| RetrievedChunk {
                result_index: i + 1,
                chunk_id: r.id.clone(),
                content: r.content.clone(),
                score: r.score,
                relevance_level: relevance_label(r.score).to_string(),
                knowledge_id: r.knowledge_id.clone(),
                knowledge_title: r.knowledge_title.clone(),
                match_type: r.match_type.label(),
            })
            .collect()
    }

    /// Visualization projection: one node per result, no edges yet.
    pub fn graph_projection(&self) -> GraphProjection {
        let nodes: Vec<GraphNodeView> = self
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| GraphNodeView {
                id: r.id.clone(),
                label: format!("Chunk {}", i + 1),
                content: r.content.clone(),
                kb_id: r.knowledge_id.clone(),
                kb_title: r.knowledge_title.clone(),
                score: r.score,
                kind: "chunk".to_string(),
            })
            .collect();
        GraphProjection {
            total_nodes: nodes.len(),
            nodes,
            edges: Vec::new(),
            total_edges: 0,
        }
    }
}

/// The multi-source query engine.
pub struct MultiSourceSearch {
    service: Arc<dyn KnowledgeBaseService>,
}

impl MultiSourceSearch {
    /// Creates an engine over the given knowledge base service.
    pub fn new(service: Arc<dyn KnowledgeBaseService>) -> Self {
        Self { service }
    }

    /// Runs the request against every source concurrently.
    ///
    /// Collaborator failures are recorded per source and never abort the
    /// other sources. Cancellation aborts in-flight units and discards
    /// partial results.
    pub async fn run(
        &self,
        request: &FanoutRequest,
        cancel: &CancellationToken,
    ) -> RagloopResult<FanoutReport> {
        info!(
            sources = request.source_ids.len(),
            top_k = request.top_k,
            check_graph = request.check_graph,
            "Starting multi-source search"
        );

        if cancel.is_cancelled() {
            return Err(RagloopError::Cancelled);
        }

        let params = SearchParams {
            query_text: request.query.clone(),
            match_count: request.top_k,
        };
        let outcomes: Arc<Mutex<HashMap<usize, SourceOutcome>>> =
            Arc::new(Mutex::new(HashMap::with_capacity(request.source_ids.len())));

        let mut units = JoinSet::new();
        for (idx, source_id) in request.source_ids.iter().enumerate() {
            let service = self.service.clone();
            let outcomes = outcomes.clone();
            let source_id = source_id.clone();
            let params = params.clone();
            let check_graph = request.check_graph;
            units.spawn(async move {
                let outcome = search_source(service.as_ref(), &source_id, &params, check_graph).await;
                outcomes.lock().insert(idx, outcome);
            });
        }

        let join_all = async {
            while let Some(joined) = units.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Source search task did not complete");
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Multi-source search cancelled");
                return Err(RagloopError::Cancelled);
            }
            _ = join_all => {}
        }
        // A token fired while the last unit finished still discards the merge.
        if cancel.is_cancelled() {
            warn!("Multi-source search cancelled after join");
            return Err(RagloopError::Cancelled);
        }

        let mut outcomes = std::mem::take(&mut *outcomes.lock());
        Ok(merge(request, &mut outcomes))
    }
}

async fn search_source(
    service: &dyn KnowledgeBaseService,
    source_id: &str,
    params: &SearchParams,
    check_graph: bool,
) -> SourceOutcome {
    let kb = match service.get_knowledge_base(source_id).await {
        Ok(kb) => kb,
        Err(e) => {
            warn!(source_id, error = %e, "Failed to resolve knowledge base");
            return SourceOutcome::Failed {
                message: format!("failed to get knowledge base: {e}"),
            };
        }
    };

    if check_graph && !kb.has_graph() {
        debug!(source_id, "No graph extraction configured, running regular search");
    }

    match service.hybrid_search(source_id, params).await {
        Ok(results) => {
            debug!(source_id, hits = results.len(), "Source search finished");
            SourceOutcome::Succeeded { kb, results }
        }
        Err(e) => {
            warn!(source_id, error = %e, "Source search failed");
            SourceOutcome::Failed {
                message: format!("search failed: {e}"),
            }
        }
    }
}

/// Sort key for a score. NaN ranks below every real score.
fn rank_score(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

fn merge(request: &FanoutRequest, outcomes: &mut HashMap<usize, SourceOutcome>) -> FanoutReport {
    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    let mut kb_counts = BTreeMap::new();
    let mut graph_configs = BTreeMap::new();
    let mut errors = Vec::new();

    for (idx, source_id) in request.source_ids.iter().enumerate() {
        match outcomes.remove(&idx) {
            Some(SourceOutcome::Succeeded { kb, results: hits }) => {
                if let Some(config) = kb.extract_config.as_ref().filter(|c| c.is_configured()) {
                    graph_configs.insert(source_id.clone(), config.summary());
                }
                kb_counts.insert(source_id.clone(), hits.len());
                for hit in hits {
                    if seen.insert(hit.id.clone()) {
                        results.push(hit);
                    }
                }
            }
            Some(SourceOutcome::Failed { message }) => errors.push(SourceError {
                knowledge_base_id: source_id.clone(),
                message,
            }),
            None => errors.push(SourceError {
                knowledge_base_id: source_id.clone(),
                message: "search task did not complete".to_string(),
            }),
        }
    }

    results.sort_by(|a, b| rank_score(b.score).total_cmp(&rank_score(a.score)));

    info!(
        unique_results = results.len(),
        failed_sources = errors.len(),
        "Multi-source search merged"
    );

    FanoutReport {
        query: request.query.clone(),
        source_ids: request.source_ids.clone(),
        results,
        kb_counts,
        graph_configs,
        errors,
    }
}
