//! Gateway error taxonomy.
//!
//! | Variant     | Cause                                            | HTTP |
//! |-------------|--------------------------------------------------|------|
//! | `Transport` | DNS, connect, timeout, body read failure         | 500  |
//! | `Provider`  | upstream error object or non-2xx status          | 500  |
//! | `Malformed` | upstream body is not a JSON object               | 500  |
//!
//! Every variant is answered with the same `{ "response" }` shape; only the
//! wording differs.

use thiserror::Error;

/// Fixed reply for transport failures. Deliberately carries no detail.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Error contacting the completion API.";

/// Prefix for provider-reported failures; the upstream message follows it.
pub const PROVIDER_FAILURE_PREFIX: &str = "Completion API error";

/// Outcome of relaying one prompt.
pub type PromptResult = Result<String, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The upstream provider could not be reached or the exchange broke off.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The upstream provider answered but reported an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The upstream provider answered with something that is not a JSON object.
    #[error("Malformed provider payload: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Human-readable text placed in the `response` field of the failure reply.
    pub fn client_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_MESSAGE.to_string(),
            Self::Provider(message) => format!("{PROVIDER_FAILURE_PREFIX}: {message}"),
            Self::Malformed(_) => {
                format!("{PROVIDER_FAILURE_PREFIX}: malformed response from provider")
            }
        }
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Provider(_) => "provider",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
