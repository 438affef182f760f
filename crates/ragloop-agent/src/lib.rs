//! Chat protocol adapter and tool-calling loop for ragloop.
//!
//! Neutral [`Message`](ragloop_core::Message)s and [`ChatOptions`] go in;
//! the [`provider`] table decides how each vendor wants them encoded, the
//! [`wire`] module produces and parses OpenAI-compatible bodies and SSE
//! streams, and [`AgentRunner`] drives the model through tool calls until it
//! answers.

/// Chat backends.
pub mod backends;
/// `[model]` and `[agent]` configuration.
pub mod config;
/// Per-request options.
pub mod options;
/// Provider descriptors and model-family quirks.
pub mod provider;
/// Aggregated model responses.
pub mod response;
/// The tool-calling loop.
pub mod runner;
/// Streaming events and the stream handle.
pub mod stream;
/// Wire encoding and decoding.
pub mod wire;

pub use backends::openai::OpenAiCompatibleBackend;
pub use backends::ChatBackend;
pub use config::{AgentConfig, ModelConfig};
pub use options::{ChatOptions, ResponseFormat, ToolChoice};
pub use provider::{ModelCapability, ModelFamily, ProviderDescriptor, ProviderName, ProviderRegistry, ThinkingStyle};
pub use response::{ChatResponse, Usage};
pub use runner::{AgentOutcome, AgentRunner, ToolExecution};
pub use stream::{ChatStream, StreamEvent};
pub use wire::StreamAccumulator;
