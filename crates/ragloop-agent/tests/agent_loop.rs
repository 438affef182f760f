#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end runs of the agent loop: mock model endpoint, built-in tools,
//! in-memory knowledge store.

use ragloop_agent::{
    AgentConfig, AgentRunner, ModelConfig, OpenAiCompatibleBackend, ProviderRegistry, StreamEvent,
};
use ragloop_builtins::{register_builtins, KnowledgeServices};
use ragloop_core::{RagloopError, Role, ToolData};
use ragloop_knowledge::{Chunk, ChunkType, InMemoryKnowledgeStore, Knowledge, KnowledgeBase};
use ragloop_tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn tools() -> Arc<ToolRegistry> {
    let store = Arc::new(InMemoryKnowledgeStore::new());
    store
        .add_knowledge_base(KnowledgeBase {
            id: "ops".into(),
            name: "Operations".into(),
            extract_config: None,
        })
        .await;
    store
        .add_document(Knowledge {
            id: "runbook".into(),
            knowledge_base_id: "ops".into(),
            title: "Runbook".into(),
        })
        .await;
    for (i, text) in ["restart the gateway with systemctl", "rotate logs weekly"]
        .iter()
        .enumerate()
    {
        store
            .add_chunk(Chunk {
                id: format!("rb-{i}"),
                knowledge_id: "runbook".into(),
                knowledge_base_id: "ops".into(),
                chunk_index: i as u64,
                content: (*text).into(),
                chunk_type: ChunkType::Text,
                start_at: 0,
                end_at: 0,
                parent_chunk_id: None,
                images: vec![],
            })
            .await;
    }

    let mut registry = ToolRegistry::new();
    register_builtins(
        &mut registry,
        &KnowledgeServices::from_store(store),
        vec!["ops".into()],
    )
    .unwrap();
    Arc::new(registry)
}

fn backend(server: &MockServer, model: &str) -> Arc<OpenAiCompatibleBackend> {
    let mut config = ModelConfig::new(model);
    config.base_url = Some(server.uri());
    Arc::new(OpenAiCompatibleBackend::new(&config, &ProviderRegistry::builtin().unwrap()).unwrap())
}

fn tool_call_turn() -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [
                    {
                        "id": "call_plan",
                        "type": "function",
                        "function": {
                            "name": "todo_write",
                            "arguments": "{\"task\":\"restart procedure\",\"steps\":[{\"id\":\"s1\",\"description\":\"search runbook\",\"status\":\"in_progress\"}]}"
                        }
                    },
                    {
                        "id": "call_search",
                        "type": "function",
                        "function": {"name": "knowledge_search", "arguments": "{\"query\":\"restart gateway\"}"}
                    }
                ]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

// ---------------------------------------------------------------------------
// 1. Full loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn loop_executes_builtins_and_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_turn()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Use systemctl to restart the gateway."}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let runner = AgentRunner::new(backend(&server, "qwen3-32b"), tools().await, AgentConfig::default());
    let outcome = runner
        .run(&[], "How do I restart the gateway?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.answer, "Use systemctl to restart the gateway.");
    assert_eq!(outcome.turns, 2);
    assert_eq!(outcome.executions.len(), 2);
    assert!(outcome.executions.iter().all(|e| e.result.success));
    assert!(matches!(outcome.executions[0].result.data, Some(ToolData::Plan(_))));
    let Some(ToolData::SearchResults(search)) = &outcome.executions[1].result.data else {
        panic!("missing search payload");
    };
    assert_eq!(search.knowledge_base_ids, vec!["ops"]);
    assert_eq!(search.results[0].chunk_id, "rb-0");

    // Second request carried both tool replies with matching ids.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: serde_json::Value = requests[1].body_json().unwrap();
    let messages = second["messages"].as_array().unwrap();
    let assistant = &messages[2];
    assert_eq!(assistant["role"], "assistant");
    assert!(assistant["content"].is_null());
    let replies: Vec<_> = messages
        .iter()
        .filter(|m| m["role"] == "tool")
        .map(|m| m["tool_call_id"].as_str().unwrap())
        .collect();
    assert_eq!(replies, vec!["call_plan", "call_search"]);
    assert_eq!(second["enable_thinking"], false);

    let first: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(first["tools"].as_array().unwrap().len(), 5);
    assert_eq!(outcome.messages.last().unwrap().role, Role::Assistant);
}

#[tokio::test]
async fn streaming_loop_forwards_events() {
    let server = MockServer::start().await;
    let body = [
        r#"data: {"choices":[{"delta":{"content":"All "}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"good."},"finish_reason":"stop"}]}"#,
        "data: [DONE]",
    ]
    .iter()
    .map(|l| format!("{l}\n\n"))
    .collect::<String>();
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::channel(64);
    let runner = AgentRunner::new(backend(&server, "gpt-4o"), tools().await, AgentConfig::default())
        .with_streaming(Some(tx));
    let outcome = runner
        .run(&[], "status?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.answer, "All good.");

    drop(runner);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 3);
    assert!(matches!(events[2], StreamEvent::Done { .. }));
}

// ---------------------------------------------------------------------------
// 2. Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_during_model_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tool_call_turn())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let runner = AgentRunner::new(backend(&server, "gpt-4o"), tools().await, AgentConfig::default());
    let err = tokio::time::timeout(Duration::from_secs(5), runner.run(&[], "q", &token))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RagloopError::Cancelled));
}
