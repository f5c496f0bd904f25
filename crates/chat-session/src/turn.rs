//! Conversation turns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a turn within one session. Strictly increasing in
/// creation order.
pub type SequenceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Reply from the assistant, including fixed failure and hand-off notices.
    Assistant,
    /// Placeholder shown while a completion is in flight. Carries no text.
    Pending,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// One message in a conversation. Immutable once created; the only change a
/// session ever makes is swapping its active `Pending` turn for the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub sequence_id: SequenceId,
}

impl Turn {
    pub fn user(sequence_id: SequenceId, text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sequence_id,
        }
    }

    pub fn assistant(sequence_id: SequenceId, text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            sequence_id,
        }
    }

    pub fn pending(sequence_id: SequenceId) -> Self {
        Self {
            role: Role::Pending,
            text: String::new(),
            sequence_id,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.role == Role::Pending
    }
}
