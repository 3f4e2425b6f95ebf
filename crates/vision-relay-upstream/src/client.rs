//! Streaming chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::Client;
pub use reqwest::StatusCode;
use vision_relay_core::Turn;

use crate::protocol::ChatCompletionRequest;

/// Raw upstream event-stream bytes, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// Upstream error.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("Upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Upstream stream error: {0}")]
    Stream(#[source] reqwest::Error),
    #[error("Upstream client setup failed: {0}")]
    Build(#[source] reqwest::Error),
}

/// Trait for model servers that stream chat completions.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a streaming completion over the full conversation log.
    ///
    /// Resolves once the upstream accepted the request; the returned stream
    /// yields the response body.
    async fn stream_chat(&self, messages: &[Turn]) -> Result<ByteStream, UpstreamError>;
}

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `http://localhost:1234/v1`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Connect timeout. `None` waits as long as the OS does.
    pub connect_timeout: Option<Duration>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "google/gemma-3-4b".to_string(),
            connect_timeout: None,
        }
    }
}

/// Client for a local OpenAI-compatible model server.
///
/// No overall request timeout is set: completions stream for as long as the
/// model keeps generating. Failed requests are not retried.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl UpstreamClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(UpstreamError::Build)?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for UpstreamClient {
    async fn stream_chat(&self, messages: &[Turn]) -> Result<ByteStream, UpstreamError> {
        let body = ChatCompletionRequest::streaming(&self.model, messages);

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            turns = messages.len(),
            "Dispatching chat completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::Connect)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, body });
        }

        Ok(response.bytes_stream().map_err(UpstreamError::Stream).boxed())
    }
}
