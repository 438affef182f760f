use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reflective reasoning side channel.
pub const THINKING: &str = "thinking";
/// Retrieval plan writer.
pub const TODO_WRITE: &str = "todo_write";
/// Keyword lookup over chunks.
pub const GREP_CHUNKS: &str = "grep_chunks";
/// Multi-source semantic search.
pub const KNOWLEDGE_SEARCH: &str = "knowledge_search";
/// Paged listing of a document's chunks.
pub const LIST_KNOWLEDGE_CHUNKS: &str = "list_knowledge_chunks";
/// Multi-source knowledge graph query.
pub const QUERY_KNOWLEDGE_GRAPH: &str = "query_knowledge_graph";
/// Document metadata lookup.
pub const GET_DOCUMENT_INFO: &str = "get_document_info";
/// Database query.
pub const DATABASE_QUERY: &str = "database_query";
/// Data file analysis.
pub const DATA_ANALYSIS: &str = "data_analysis";
/// Tabular file metadata.
pub const DATA_SCHEMA: &str = "data_schema";
/// Web search.
pub const WEB_SEARCH: &str = "web_search";
/// Web page fetch.
pub const WEB_FETCH: &str = "web_fetch";

/// Tool metadata exposed to settings UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTool {
    /// Tool name.
    pub name: String,
    /// Short display label.
    pub label: String,
    /// One-line description.
    pub description: String,
}

impl AvailableTool {
    fn new(name: &str, label: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

/// The tools a settings UI may offer. Web tools are configured separately and
/// are not listed here.
pub fn available_tool_definitions() -> Vec<AvailableTool> {
    vec![
        AvailableTool::new(THINKING, "Thinking", "Dynamic, reflective problem solving"),
        AvailableTool::new(TODO_WRITE, "Plan", "Write a structured research plan"),
        AvailableTool::new(
            GREP_CHUNKS,
            "Keyword search",
            "Quickly find documents and chunks containing specific keywords",
        ),
        AvailableTool::new(
            KNOWLEDGE_SEARCH,
            "Semantic search",
            "Understand the question and find semantically related content",
        ),
        AvailableTool::new(
            LIST_KNOWLEDGE_CHUNKS,
            "Document chunks",
            "Read the full chunk content of a document",
        ),
        AvailableTool::new(
            QUERY_KNOWLEDGE_GRAPH,
            "Knowledge graph",
            "Query relationships in the knowledge graph",
        ),
        AvailableTool::new(GET_DOCUMENT_INFO, "Document info", "Inspect document metadata"),
        AvailableTool::new(DATABASE_QUERY, "Database query", "Query database information"),
        AvailableTool::new(DATA_ANALYSIS, "Data analysis", "Understand and analyze data files"),
        AvailableTool::new(DATA_SCHEMA, "Data schema", "Inspect metadata of tabular files"),
    ]
}

/// Tools enabled when a tenant has not configured its own list.
pub fn default_allowed_tools() -> Vec<String> {
    [
        THINKING,
        TODO_WRITE,
        KNOWLEDGE_SEARCH,
        GREP_CHUNKS,
        LIST_KNOWLEDGE_CHUNKS,
        QUERY_KNOWLEDGE_GRAPH,
        GET_DOCUMENT_INFO,
        DATABASE_QUERY,
        DATA_ANALYSIS,
        DATA_SCHEMA,
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// An enable list. Advertising and execution each take their own filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolFilter {
    /// Every registered tool.
    #[default]
    All,
    /// Only the named tools.
    Only(BTreeSet<String>),
}

impl ToolFilter {
    /// Allows every tool.
    pub fn all() -> Self {
        ToolFilter::All
    }

    /// Allows only the given names.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolFilter::Only(names.into_iter().map(Into::into).collect())
    }

    /// The default-allowed subset of the catalog.
    pub fn default_allowed() -> Self {
        Self::only(default_allowed_tools())
    }

    /// `None` means every tool; `Some(list)` restricts to the list.
    pub fn from_config(names: Option<&[String]>) -> Self {
        match names {
            None => ToolFilter::All,
            Some(names) => Self::only(names.iter().cloned()),
        }
    }

    /// Whether `name` passes the filter.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            ToolFilter::All => true,
            ToolFilter::Only(names) => names.contains(name),
        }
    }
}
