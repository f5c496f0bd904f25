//! Gateway client: the session's only way to obtain completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_GATEWAY_URL: &str = "http://localhost:5000/api/chat";
pub const ENV_GATEWAY_URL: &str = "MENTOR_CHAT_GATEWAY_URL";

/// Fixed reply when the gateway could not be reached.
pub const TRANSPORT_FAILURE_REPLY: &str = "There was an error connecting to the AI service.";

/// Fixed reply when the gateway or its provider reported a failure.
pub const PROVIDER_FAILURE_REPLY: &str =
    "The AI service returned an error. Please try again in a moment.";

/// Why a dispatched prompt produced no completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Network failure reaching the gateway.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The gateway answered with a failure status.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The gateway answered 2xx but not with `{ "response": string }`.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl DispatchError {
    /// The fixed text the session shows for this failure.
    ///
    /// Protocol errors read the same as provider errors.
    pub fn reply_text(&self) -> &'static str {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_REPLY,
            Self::Provider(_) | Self::Protocol(_) => PROVIDER_FAILURE_REPLY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Provider(_) => "provider",
            Self::Protocol(_) => "protocol",
        }
    }
}

/// "Send prompt, get text."
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Obtain a completion for `prompt`. An empty string is a valid reply.
    async fn complete(&self, prompt: &str) -> Result<String, DispatchError>;
}

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    response: String,
}

/// [`CompletionBackend`] speaking the gateway's `POST /api/chat` contract.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    url: String,
    http: reqwest::Client,
}

impl HttpGatewayClient {
    /// No request timeout is set; the transport's own behavior applies.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            url: url.into(),
            http: reqwest::Client::builder().build()?,
        })
    }

    /// Client for `MENTOR_CHAT_GATEWAY_URL`, or the local default.
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let url = std::env::var(ENV_GATEWAY_URL)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        Self::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionBackend for HttpGatewayClient {
    async fn complete(&self, prompt: &str) -> Result<String, DispatchError> {
        let response = self
            .http
            .post(&self.url)
            .json(&PromptRequest { prompt })
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let decoded = serde_json::from_slice::<GatewayReply>(&body);

        if !status.is_success() {
            let message = match decoded {
                Ok(reply) => reply.response,
                Err(_) => format!("gateway returned status {}", status.as_u16()),
            };
            warn!(%status, %message, "Gateway reported failure");
            return Err(DispatchError::Provider(message));
        }

        let reply = decoded.map_err(|e| DispatchError::Protocol(e.to_string()))?;
        debug!(reply_len = reply.response.len(), "Gateway reply received");
        Ok(reply.response)
    }
}
