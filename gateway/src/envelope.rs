//! Upstream chat-completion wire types.
//!
//! Requests are fully typed. Responses are not: providers attach an `error`
//! object to 2xx bodies, drop `choices` entirely, or return HTML from a
//! load balancer. The body is therefore decoded as untyped JSON and reduced to
//! a [`ProviderEnvelope`].

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body sent to the upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatCompletionRequest {
    /// Single-message conversation; no history is forwarded.
    pub fn single_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: prompt.into(),
            }],
        }
    }
}

/// Decoded upstream outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEnvelope {
    /// First choice's message content; empty when the provider sent none.
    Success(String),
    /// Provider reported an error, either in the body or via status.
    ProviderError(String),
    /// Body was not a JSON object.
    Malformed(String),
}

impl ProviderEnvelope {
    /// Decode a raw upstream body. The error object wins over choices.
    pub fn decode(body: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => return Self::Malformed(format!("invalid JSON: {e}")),
        };

        let Some(object) = value.as_object() else {
            return Self::Malformed(format!("expected JSON object, got {}", json_kind(&value)));
        };

        if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
            return Self::ProviderError(error_message(error));
        }

        let text = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self::Success(text)
    }

    /// Decode a body together with the HTTP status it arrived with.
    ///
    /// A non-2xx status is never a success, even when the body looks like one.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        match Self::decode(body) {
            Self::Success(_) if !status.is_success() => {
                Self::ProviderError(format!("upstream returned status {}", status.as_u16()))
            }
            Self::Malformed(_) if !status.is_success() => {
                Self::ProviderError(format!("upstream returned status {}", status.as_u16()))
            }
            other => other,
        }
    }

    pub fn into_result(self) -> Result<String, GatewayError> {
        match self {
            Self::Success(text) => Ok(text),
            Self::ProviderError(message) => Err(GatewayError::Provider(message)),
            Self::Malformed(detail) => Err(GatewayError::Malformed(detail)),
        }
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => error.to_string(),
        },
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
