//! The relay: one prompt in, one normalized result out.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::envelope::{ChatCompletionRequest, ProviderEnvelope};
use crate::error::{GatewayError, PromptResult};

/// Shared reference to a gateway, as held by the HTTP router state.
pub type SharedGateway = Arc<CompletionGateway>;

/// Stateless relay to the upstream chat-completion provider.
///
/// Holds only immutable configuration and a connection-pooling HTTP client,
/// so any number of concurrent requests may share one instance.
#[derive(Debug, Clone)]
pub struct CompletionGateway {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl CompletionGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn shared(self) -> SharedGateway {
        Arc::new(self)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Forward `prompt` upstream and reduce the reply to text or a classified
    /// failure. Never panics on empty input; the prompt is forwarded as is.
    pub async fn relay(&self, prompt: &str) -> PromptResult {
        let request = ChatCompletionRequest::single_prompt(&self.config.model, prompt);

        debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Relaying prompt upstream"
        );

        let response = match self
            .http
            .post(&self.config.upstream_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, "Upstream request failed");
                return Err(GatewayError::from(e));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(%status, error = %e, "Failed to read upstream body");
                return Err(GatewayError::from(e));
            }
        };

        debug!(
            %status,
            payload = %String::from_utf8_lossy(&body),
            "Upstream response"
        );

        let envelope = ProviderEnvelope::from_response(status, &body);
        match &envelope {
            ProviderEnvelope::Success(text) => {
                info!(%status, reply_len = text.len(), "Upstream completion received");
            }
            ProviderEnvelope::ProviderError(message) => {
                error!(%status, %message, "Upstream returned error");
            }
            ProviderEnvelope::Malformed(detail) => {
                warn!(%status, %detail, "Upstream payload malformed");
            }
        }

        envelope.into_result()
    }
}
