use thiserror::Error;

/// A convenience `Result` alias using [`RagloopError`].
pub type RagloopResult<T> = Result<T, RagloopError>;

/// Top-level error type for the ragloop runtime.
///
/// Each variant corresponds to a subsystem that can produce errors. Tool-level
/// failures normally travel as [`crate::ToolResult`] values; this type is used
/// for faults that callers must observe directly.
#[derive(Error, Debug)]
pub enum RagloopError {
    /// A tool failed while executing.
    #[error("Tool error: {0}")]
    Tool(String),

    /// The model requested a tool that is not registered.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments were missing, malformed, or out of range.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A knowledge collaborator (lookup, search, listing) failed.
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// A requested knowledge base, document, or chunk does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The model provider answered with something the adapter cannot use.
    #[error("Provider error: {0}")]
    Provider(String),

    /// An outbound HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration parsing or validation failed.
    #[error("Config error: {0}")]
    Config(String),

    /// The tool-calling loop failed.
    #[error("Agent error: {0}")]
    Agent(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagloopError {
    /// Whether the error was caused by the caller's input rather than a collaborator.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RagloopError::InvalidArguments(_) | RagloopError::ToolNotFound(_) | RagloopError::Json(_)
        )
    }
}
