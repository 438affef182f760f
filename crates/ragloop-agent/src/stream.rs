use crate::response::ChatResponse;
use futures_util::{Stream, StreamExt};
use ragloop_core::{RagloopError, RagloopResult};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Events emitted during a streaming chat response.
///
/// A stream yields deltas in arrival order and ends with exactly one
/// [`StreamEvent::Done`] or [`StreamEvent::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of answer text.
    TextDelta {
        /// The new text.
        text: String,
    },

    /// A chunk of reasoning text.
    ThinkingDelta {
        /// The new text.
        text: String,
    },

    /// A new tool call has started.
    ToolCallStart {
        /// Vendor index of the call.
        index: u64,
        /// Call id (generated when the vendor sent none).
        id: String,
        /// Tool name; may be empty until a later fragment names it.
        name: String,
    },

    /// An incremental fragment of tool call arguments (JSON string delta).
    ToolCallDelta {
        /// Call id.
        id: String,
        /// The new fragment.
        arguments_delta: String,
    },

    /// A tool call's arguments are now complete.
    ToolCallEnd {
        /// Call id.
        id: String,
    },

    /// The stream has finished successfully.
    Done {
        /// Vendor finish reason, when reported.
        finish_reason: Option<String>,
    },

    /// The stream failed; no further events follow.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// Receive side of a streaming response.
///
/// Yields [`StreamEvent`]s; [`ChatStream::finish`] drains what is left and
/// returns the aggregated [`ChatResponse`]. Cancelling or dropping the
/// stream aborts the producer task, which releases the HTTP connection.
pub struct ChatStream {
    events: ReceiverStream<StreamEvent>,
    producer: Option<JoinHandle<RagloopResult<ChatResponse>>>,
    cancel: CancellationToken,
}

impl ChatStream {
    /// Wraps a producer task and the channel it writes to. `cancel` must be
    /// the token the producer watches.
    pub fn new(
        events: mpsc::Receiver<StreamEvent>,
        producer: JoinHandle<RagloopResult<ChatResponse>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events: ReceiverStream::new(events),
            producer: Some(producer),
            cancel,
        }
    }

    /// Stops the producer. Events already buffered can still be read.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Some(producer) = &self.producer {
            producer.abort();
        }
    }

    /// Whether [`ChatStream::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drains remaining events and waits for the aggregated response.
    pub async fn finish(mut self) -> RagloopResult<ChatResponse> {
        while self.events.next().await.is_some() {}
        let Some(producer) = self.producer.take() else {
            return Err(RagloopError::Provider("stream already finished".to_string()));
        };
        match producer.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(RagloopError::Cancelled),
            Err(e) => Err(RagloopError::Provider(format!("stream task failed: {e}"))),
        }
    }
}

impl Stream for ChatStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.cancel();
    }
}
