/// OpenAI-compatible HTTP backend.
pub mod openai;

use crate::options::ChatOptions;
use crate::response::ChatResponse;
use crate::stream::ChatStream;
use async_trait::async_trait;
use ragloop_core::{Message, RagloopResult};

/// A model provider endpoint.
///
/// Implementations translate neutral messages and options into their wire
/// format and back. Vendor quirks live in the provider table, not in
/// implementations of this trait.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Non-streaming chat completion.
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> RagloopResult<ChatResponse>;

    /// Streaming chat completion.
    ///
    /// Returns once the response headers arrive; events follow on the
    /// returned [`ChatStream`].
    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> RagloopResult<ChatStream>;

    /// Model name sent on the wire, for logs.
    fn model_name(&self) -> &str;
}
