use super::ChatBackend;
use crate::config::ModelConfig;
use crate::options::ChatOptions;
use crate::provider::{ModelFamily, ProviderName, ProviderRegistry};
use crate::response::ChatResponse;
use crate::stream::{ChatStream, StreamEvent};
use crate::wire::{build_request_body, parse_chat_response, LineBuffer, StreamAccumulator};
use async_trait::async_trait;
use futures_util::StreamExt;
use ragloop_core::{Message, RagloopError, RagloopResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// OpenAI-compatible chat completions backend.
///
/// Works with every vendor in the provider table that exposes the
/// `/chat/completions` surface, and with self-hosted servers (vLLM, Ollama).
pub struct OpenAiCompatibleBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model_name: String,
    provider: ProviderName,
    family: ModelFamily,
    request_timeout: Duration,
}

impl OpenAiCompatibleBackend {
    /// Resolves provider, endpoint, and model family from `config`.
    pub fn new(config: &ModelConfig, providers: &ProviderRegistry) -> RagloopResult<Self> {
        let endpoint = config.chat_endpoint(providers)?;
        let provider = config.provider_name(providers);
        let family = providers.family(&config.model_name);
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagloopError::Http(e.to_string()))?;

        info!(
            provider = %provider,
            model = %config.model_name,
            family = family.name,
            endpoint = %endpoint,
            "Chat backend configured"
        );

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            model_name: config.model_name.clone(),
            provider,
            family,
            request_timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// The resolved provider.
    pub fn provider(&self) -> ProviderName {
        self.provider
    }

    /// Base URL requests go to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Content-Type", "application/json")
            .json(body);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, body: &serde_json::Value) -> RagloopResult<reqwest::Response> {
        let resp = self
            .request(body)
            .send()
            .await
            .map_err(|e| RagloopError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RagloopError::Http(format!(
                "{} API error {status}: {error_body}",
                self.provider
            )));
        }
        Ok(resp)
    }

    /// [`Self::send`] bounded by the configured request timeout.
    async fn send_with_timeout(&self, body: &serde_json::Value) -> RagloopResult<reqwest::Response> {
        tokio::time::timeout(self.request_timeout, self.send(body))
            .await
            .map_err(|_| RagloopError::Http("request timed out".to_string()))?
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    async fn chat(&self, messages: &[Message], options: &ChatOptions) -> RagloopResult<ChatResponse> {
        let body = build_request_body(&self.model_name, messages, options, &self.family, false);
        let resp = self.send_with_timeout(&body).await?;

        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RagloopError::Http(e.to_string()))?;
        parse_chat_response(&resp_body)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> RagloopResult<ChatStream> {
        let body = build_request_body(&self.model_name, messages, options, &self.family, true);
        let resp = self.send_with_timeout(&body).await?;

        let (tx, rx) = mpsc::channel::<StreamEvent>(256);
        let cancel = CancellationToken::new();
        let watched = cancel.clone();
        let mut byte_stream = resp.bytes_stream();

        let handle = tokio::spawn(async move {
            let mut lines = LineBuffer::new();
            let mut acc = StreamAccumulator::new();

            loop {
                let chunk = tokio::select! {
                    _ = watched.cancelled() => {
                        debug!("Stream cancelled by consumer");
                        return Err(RagloopError::Cancelled);
                    }
                    chunk = byte_stream.next() => chunk,
                };
                let Some(chunk) = chunk else { break };

                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let message = format!("Stream read error: {e}");
                        let _ = tx.send(StreamEvent::Error { message: message.clone() }).await;
                        return Err(RagloopError::Http(message));
                    }
                };

                for line in lines.push(&bytes) {
                    let events = match acc.feed_line(&line) {
                        Ok(events) => events,
                        Err(e) => {
                            let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                            return Err(e);
                        }
                    };
                    for event in events {
                        if tx.send(event).await.is_err() {
                            debug!("Stream receiver dropped");
                            return Err(RagloopError::Cancelled);
                        }
                    }
                }
            }

            if let Some(line) = lines.flush() {
                match acc.feed_line(&line) {
                    Ok(events) => {
                        for event in events {
                            let _ = tx.send(event).await;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                        return Err(e);
                    }
                }
            }
            let (events, response) = acc.finish();
            for event in events {
                let _ = tx.send(event).await;
            }
            Ok(response)
        });

        Ok(ChatStream::new(rx, handle, cancel))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
