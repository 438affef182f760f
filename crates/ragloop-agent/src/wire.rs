//! OpenAI chat-completions wire format.
//!
//! Encoding turns neutral messages and [`ChatOptions`] into a request body,
//! applying the model family's quirks. Decoding covers single-shot bodies
//! ([`parse_chat_response`]) and server-sent event streams
//! ([`StreamAccumulator`]). Nothing here touches the network.

use crate::options::ChatOptions;
use crate::provider::ModelFamily;
use crate::response::{ChatResponse, Usage};
use crate::stream::StreamEvent;
use ragloop_core::{Message, RagloopError, RagloopResult, Role, ToolCall};
use ragloop_tools::ToolDescriptor;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Encodes the conversation.
///
/// An assistant message that only carries tool calls gets `null` content;
/// several vendors reject an empty string there.
pub fn encode_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let mut wire = json!({ "role": m.role.as_str() });
            wire["content"] = if m.role == Role::Assistant && m.has_tool_calls() && m.content.is_empty()
            {
                Value::Null
            } else {
                Value::String(m.content.clone())
            };
            if m.has_tool_calls() {
                wire["tool_calls"] = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {"name": c.name, "arguments": c.arguments}
                        })
                    })
                    .collect();
            }
            if m.role == Role::Tool {
                if let Some(id) = &m.tool_call_id {
                    wire["tool_call_id"] = json!(id);
                }
                if let Some(name) = &m.name {
                    wire["name"] = json!(name);
                }
            }
            wire
        })
        .collect()
}

/// Encodes tool descriptors as function definitions.
pub fn encode_tools(tools: &[ToolDescriptor]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters_schema,
                }
            })
        })
        .collect()
}

/// Builds a complete request body for `model_name`.
pub fn build_request_body(
    model_name: &str,
    messages: &[Message],
    options: &ChatOptions,
    family: &ModelFamily,
    stream: bool,
) -> Value {
    let mut body = json!({
        "model": model_name,
        "messages": encode_messages(messages),
        "stream": stream,
    });

    let sampling = [
        ("temperature", options.temperature.map(|v| json!(v))),
        ("top_p", options.top_p.map(|v| json!(v))),
        ("seed", options.seed.map(|v| json!(v))),
        ("max_tokens", options.max_tokens.map(|v| json!(v))),
        (
            "max_completion_tokens",
            options.max_completion_tokens.map(|v| json!(v)),
        ),
        ("frequency_penalty", options.frequency_penalty.map(|v| json!(v))),
        ("presence_penalty", options.presence_penalty.map(|v| json!(v))),
    ];
    for (key, value) in sampling {
        if let Some(value) = value {
            body[key] = value;
        }
    }

    if !options.tools.is_empty() {
        body["tools"] = Value::Array(encode_tools(&options.tools));
        if let Some(choice) = options.tool_choice.as_ref().filter(|_| family.supports_tool_choice) {
            body["tool_choice"] = choice.to_wire();
        }
    }

    if let Some(format) = &options.response_format {
        body["response_format"] = format.to_wire();
    }

    for (key, value) in family.thinking_fields(options.thinking) {
        body[key] = value;
    }

    if stream {
        body["stream_options"] = json!({"include_usage": true});
    }

    body
}

fn vendor_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    Some(
        error["message"]
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string),
    )
}

fn parse_usage(body: &Value) -> Option<Usage> {
    body.get("usage")
        .filter(|u| u.is_object())
        .and_then(|u| serde_json::from_value(u.clone()).ok())
}

fn non_empty(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Decodes a non-streaming response body.
pub fn parse_chat_response(body: &Value) -> RagloopResult<ChatResponse> {
    if let Some(message) = vendor_error(body) {
        return Err(RagloopError::Provider(message));
    }
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| RagloopError::Provider(format!("response has no choices: {body}")))?;
    let message = &choice["message"];

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .map(|tc| {
                    // A nameless call is kept so dispatch reports it as unknown.
                    let name = tc["function"]["name"].as_str().unwrap_or_default();
                    let id = non_empty(&tc["id"]).unwrap_or_else(ToolCall::generate_id);
                    let arguments = match &tc["function"]["arguments"] {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    ToolCall::new(id, name, arguments)
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content: message["content"].as_str().unwrap_or_default().to_string(),
        reasoning: non_empty(&message["reasoning_content"]),
        tool_calls,
        finish_reason: non_empty(&choice["finish_reason"]),
        usage: parse_usage(body),
    })
}

/// Splits a byte stream into lines. Bytes are buffered until a newline so
/// multi-byte characters split across chunks decode intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line they completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }

    /// Returns the unterminated tail, if any.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        Some(line).filter(|l| !l.is_empty())
    }
}

#[derive(Debug)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles a streamed response from SSE lines.
///
/// Feed it each line with [`StreamAccumulator::feed_line`]; it returns the
/// events the line produced. [`StreamAccumulator::finish`] closes any open
/// tool calls, emits the single `done` event if `[DONE]` never arrived, and
/// returns the aggregated response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    reasoning: String,
    calls: BTreeMap<u64, PartialCall>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    done: bool,
}

impl StreamAccumulator {
    /// A fresh accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal `done` event has been emitted.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Processes one SSE line. Blank lines, comments, and non-data fields
    /// produce nothing; a vendor error object is returned as an error.
    pub fn feed_line(&mut self, line: &str) -> RagloopResult<Vec<StreamEvent>> {
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(Vec::new());
        };
        let data = data.trim_start();
        if self.done {
            return Ok(Vec::new());
        }
        if data == "[DONE]" {
            return Ok(self.close());
        }

        let chunk: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed stream chunk");
                return Ok(Vec::new());
            }
        };
        if let Some(message) = vendor_error(&chunk) {
            return Err(RagloopError::Provider(message));
        }
        if let Some(usage) = parse_usage(&chunk) {
            self.usage = Some(usage);
        }

        let mut events = Vec::new();
        let Some(choice) = chunk["choices"].get(0) else {
            return Ok(events);
        };
        let delta = &choice["delta"];

        if let Some(text) = non_empty(&delta["reasoning_content"]) {
            self.reasoning.push_str(&text);
            events.push(StreamEvent::ThinkingDelta { text });
        }
        if let Some(text) = non_empty(&delta["content"]) {
            self.content.push_str(&text);
            events.push(StreamEvent::TextDelta { text });
        }

        if let Some(fragments) = delta["tool_calls"].as_array() {
            for (position, fragment) in fragments.iter().enumerate() {
                let index = fragment["index"].as_u64().unwrap_or(position as u64);
                let name = non_empty(&fragment["function"]["name"]);
                let call = self.calls.entry(index).or_insert_with(|| {
                    let id = non_empty(&fragment["id"]).unwrap_or_else(ToolCall::generate_id);
                    events.push(StreamEvent::ToolCallStart {
                        index,
                        id: id.clone(),
                        name: name.clone().unwrap_or_default(),
                    });
                    PartialCall {
                        id,
                        name: String::new(),
                        arguments: String::new(),
                    }
                });
                if let Some(name) = name.filter(|_| call.name.is_empty()) {
                    call.name = name;
                }
                if let Some(arguments) = non_empty(&fragment["function"]["arguments"]) {
                    call.arguments.push_str(&arguments);
                    events.push(StreamEvent::ToolCallDelta {
                        id: call.id.clone(),
                        arguments_delta: arguments,
                    });
                }
            }
        }

        if let Some(reason) = non_empty(&choice["finish_reason"]) {
            self.finish_reason = Some(reason);
        }
        Ok(events)
    }

    fn close(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        let mut events: Vec<StreamEvent> = self
            .calls
            .values()
            .map(|c| StreamEvent::ToolCallEnd { id: c.id.clone() })
            .collect();
        events.push(StreamEvent::Done {
            finish_reason: self.finish_reason.clone(),
        });
        events
    }

    /// Ends the stream and returns the remaining events with the aggregated
    /// response.
    pub fn finish(mut self) -> (Vec<StreamEvent>, ChatResponse) {
        let events = self.close();
        let tool_calls = std::mem::take(&mut self.calls)
            .into_values()
            .map(|c| ToolCall::new(c.id, c.name, c.arguments))
            .collect();
        let response = ChatResponse {
            content: self.content,
            reasoning: Some(self.reasoning).filter(|r| !r.is_empty()),
            tool_calls,
            finish_reason: self.finish_reason,
            usage: self.usage,
        };
        (events, response)
    }
}
