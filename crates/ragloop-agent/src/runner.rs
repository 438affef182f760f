use crate::backends::ChatBackend;
use crate::config::AgentConfig;
use crate::options::ChatOptions;
use crate::response::ChatResponse;
use crate::stream::StreamEvent;
use futures_util::StreamExt;
use ragloop_core::{validate_tool_replies, Message, RagloopError, RagloopResult, ToolCall, ToolResult};
use ragloop_tools::{ToolContext, ToolFilter, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One tool call the loop executed, with its result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolExecution {
    /// Loop turn (0-based) that issued the call.
    pub turn: u32,
    /// The call as the model produced it.
    pub call: ToolCall,
    /// What the registry returned.
    pub result: ToolResult,
}

/// What a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    /// The model's final answer.
    pub answer: String,
    /// The full transcript, system prompt first.
    pub messages: Vec<Message>,
    /// Every tool call executed, in order.
    pub executions: Vec<ToolExecution>,
    /// Model round trips used.
    pub turns: u32,
}

/// The Agent Runner: drives the tool-calling loop.
/// Prompt → model → tool calls → dispatch → tool replies → repeat.
pub struct AgentRunner {
    backend: Arc<dyn ChatBackend>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    options: ChatOptions,
    streaming: bool,
    events: Option<mpsc::Sender<StreamEvent>>,
}

impl AgentRunner {
    /// Creates a runner over `backend` and `tools`.
    pub fn new(backend: Arc<dyn ChatBackend>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            backend,
            tools,
            config,
            options: ChatOptions::default(),
            streaming: false,
            events: None,
        }
    }

    /// Base request options; the advertised tools are filled in per run.
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses streaming completions. Events are forwarded to `events` when given.
    pub fn with_streaming(mut self, events: Option<mpsc::Sender<StreamEvent>>) -> Self {
        self.streaming = true;
        self.events = events;
        self
    }

    /// Runs the loop for `user_input` after `history`.
    ///
    /// Ends when the model answers without tool calls. Exceeding
    /// `max_turns` is an error; so is cancellation.
    pub async fn run(
        &self,
        history: &[Message],
        user_input: &str,
        cancel: &CancellationToken,
    ) -> RagloopResult<AgentOutcome> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !self.config.system_prompt.is_empty() {
            messages.push(Message::system(self.config.system_prompt.clone()));
        }
        messages.extend(history.iter().cloned());
        messages.push(Message::user(user_input));

        let options = ChatOptions {
            tools: self.tools.advertised(&self.config.advertise_filter()),
            ..self.options.clone()
        };
        let execute_filter = self.config.execute_filter();
        let mut executions = Vec::new();

        info!(
            model = %self.backend.model_name(),
            tools = options.tools.len(),
            max_turns = self.config.max_turns,
            "Starting agentic loop"
        );

        for turn in 0..self.config.max_turns {
            if cancel.is_cancelled() {
                return Err(RagloopError::Cancelled);
            }
            validate_tool_replies(&messages)?;
            info!(turn, "Agentic loop turn");

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(RagloopError::Cancelled),
                response = self.complete(&messages, &options) => response?,
            };
            messages.push(response.to_message());

            if !response.has_tool_calls() {
                info!(turns = turn + 1, tool_calls = executions.len(), "Agentic loop completed");
                return Ok(AgentOutcome {
                    answer: response.content,
                    messages,
                    executions,
                    turns: turn + 1,
                });
            }

            for call in response.tool_calls {
                info!(turn, tool = %call.name, call_id = %call.id, "Executing tool call");
                let ctx = ToolContext::new().with_cancel(cancel.clone());
                let result = self.tools.dispatch(&ctx, &call, &execute_filter).await;
                if cancel.is_cancelled() {
                    return Err(RagloopError::Cancelled);
                }
                if !result.success {
                    warn!(tool = %call.name, call_id = %call.id, error = %result.error_message(), "Tool call failed");
                }
                messages.push(Message::tool(
                    call.id.clone(),
                    call.name.clone(),
                    result.to_model_content(),
                ));
                executions.push(ToolExecution { turn, call, result });
            }
        }

        warn!(max_turns = self.config.max_turns, "Agentic loop reached max turns");
        Err(RagloopError::Agent(format!(
            "Agentic loop exceeded maximum of {} turns",
            self.config.max_turns
        )))
    }

    async fn complete(&self, messages: &[Message], options: &ChatOptions) -> RagloopResult<ChatResponse> {
        if !self.streaming {
            return self.backend.chat(messages, options).await;
        }
        let mut stream = self.backend.chat_stream(messages, options).await?;
        while let Some(event) = stream.next().await {
            if let Some(sink) = &self.events {
                // A gone listener does not stop the run.
                let _ = sink.send(event).await;
            }
        }
        stream.finish().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragloop_core::Role;
    use ragloop_tools::{Tool, ToolDescriptor};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records what it was sent.
    struct ScriptedBackend {
        responses: Mutex<VecDeque<ChatResponse>>,
        seen: Mutex<Vec<(Vec<Message>, usize)>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<ChatResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, messages: &[Message], options: &ChatOptions) -> RagloopResult<ChatResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.tools.len()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RagloopError::Provider("script exhausted".into()))
        }

        async fn chat_stream(
            &self,
            _messages: &[Message],
            _options: &ChatOptions,
        ) -> RagloopResult<crate::stream::ChatStream> {
            Err(RagloopError::Provider("not scripted".into()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new(name: &str) -> Self {
            Self {
                descriptor: ToolDescriptor::new(name, "echo", serde_json::json!({"type": "object"})),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _ctx: &ToolContext, arguments: serde_json::Value) -> RagloopResult<ToolResult> {
            Ok(ToolResult::success(format!("{}:{arguments}", self.descriptor.name)))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("alpha"))).unwrap();
        registry.register(Arc::new(EchoTool::new("beta"))).unwrap();
        Arc::new(registry)
    }

    fn calls(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            tool_calls: calls,
            finish_reason: Some("tool_calls".into()),
            ..ChatResponse::default()
        }
    }

    fn answer(text: &str) -> ChatResponse {
        ChatResponse {
            content: text.into(),
            finish_reason: Some("stop".into()),
            ..ChatResponse::default()
        }
    }

    #[tokio::test]
    async fn test_tool_calls_are_answered_in_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            calls(vec![
                ToolCall::new("c1", "beta", r#"{"n":1}"#),
                ToolCall::new("c2", "alpha", r#"{"n":2}"#),
                ToolCall::new("c3", "missing", "{}"),
            ]),
            answer("done"),
        ]));
        let runner = AgentRunner::new(backend.clone(), registry(), AgentConfig::default());
        let outcome = runner
            .run(&[], "question", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "done");
        assert_eq!(outcome.turns, 2);
        assert_eq!(outcome.executions.len(), 3);
        assert_eq!(outcome.executions[0].result.output, r#"beta:{"n":1}"#);
        assert!(!outcome.executions[2].result.success);

        let replies: Vec<_> = outcome
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(replies, vec!["c1", "c2", "c3"]);
        validate_tool_replies(&outcome.messages).unwrap();

        // The second request carried the tool replies.
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[1].0.len(), outcome.messages.len() - 1);
        assert_eq!(seen[0].1, 2);
    }

    #[tokio::test]
    async fn test_filters_are_independent() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            calls(vec![ToolCall::new("c1", "beta", "{}")]),
            answer("ok"),
        ]));
        let config = AgentConfig {
            allowed_tools: Some(vec!["alpha".into(), "beta".into()]),
            executable_tools: Some(vec!["alpha".into()]),
            ..AgentConfig::default()
        };
        let outcome = AgentRunner::new(backend.clone(), registry(), config)
            .run(&[], "q", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(backend.seen.lock().unwrap()[0].1, 2);
        assert!(outcome.executions[0]
            .result
            .error_message()
            .contains("not enabled"));
    }

    #[tokio::test]
    async fn test_max_turns_exceeded() {
        let backend = Arc::new(ScriptedBackend::new(
            (0..3)
                .map(|i| calls(vec![ToolCall::new(format!("c{i}"), "alpha", "{}")]))
                .collect(),
        ));
        let config = AgentConfig {
            max_turns: 3,
            ..AgentConfig::default()
        };
        let err = AgentRunner::new(backend, registry(), config)
            .run(&[], "q", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RagloopError::Agent(m) if m.contains("maximum of 3 turns")));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = Arc::new(ScriptedBackend::new(vec![answer("never")]));
        let token = CancellationToken::new();
        token.cancel();
        let err = AgentRunner::new(backend.clone(), registry(), AgentConfig::default())
            .run(&[], "q", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, RagloopError::Cancelled));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_and_system_prompt_lead() {
        let backend = Arc::new(ScriptedBackend::new(vec![answer("hi")]));
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let outcome = AgentRunner::new(backend, registry(), AgentConfig::default())
            .run(&history, "now", &CancellationToken::new())
            .await
            .unwrap();
        let roles: Vec<_> = outcome.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }
}
