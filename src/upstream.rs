//! Upstream completion endpoint client.

use memo_protocol::chat::{ChatCompletionRequest, ChatMessage};
use tracing::{debug, warn};

use crate::{config::GatewayConfig, error::RelayError};

/// Maximum upstream error body echoed into a client-facing message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Thin client over the configured completion endpoint. One instance is
/// shared by all requests; each call opens its own streaming connection.
pub struct UpstreamClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl UpstreamClient {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Open one streaming completion. The returned response's body has not
    /// been read — the caller consumes it lazily, line by line.
    ///
    /// Fails fast with [`RelayError::UpstreamUnavailable`] when the
    /// connection cannot be established and [`RelayError::UpstreamStatus`]
    /// on a non-success status; after this returns `Ok`, any interruption
    /// is a soft end handled by the relay.
    pub async fn open_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<reqwest::Response, RelayError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            stream: true,
            temperature: Some(self.config.temperature),
        };
        let url = format!(
            "{}/chat/completions",
            self.config.upstream_url.trim_end_matches('/')
        );

        let mut builder = self.http.post(&url).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(|source| {
            warn!(url = %url, error = %source, "upstream request failed");
            RelayError::UpstreamUnavailable { source }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            warn!(url = %url, status = %status, body_preview = %body, "upstream returned error status");
            return Err(RelayError::UpstreamStatus { status, body });
        }

        debug!(url = %url, model = %self.config.model, "upstream stream opened");
        Ok(response)
    }
}
