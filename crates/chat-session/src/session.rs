//! Session state machine.
//!
//! ```text
//!            submit(text)                 resolve (reply or failure)
//!   Idle ───────────────────► Awaiting ─────────────────────────────► Idle
//!    ▲  │ empty / whitespace      │ submit(..) while awaiting
//!    └──┘ → rejected, no turn     └─► rejected, no turn, no dispatch
//! ```
//!
//! `escalation_offered` is a flag orthogonal to the phase. It is raised by
//! the escalation policy after a successful reply and cleared only by
//! [`ChatSession::accept_escalation`].
//!
//! The single-flight check and the insertion of the user and pending turns
//! happen under one lock, so concurrent callers can never create two pending
//! turns. The lock is never held across the backend call or the escalation
//! policy.
//!
//! Dropping a `submit` future mid-flight (timeout, `select!`, aborted task)
//! still resolves its pending turn, with the transport failure notice.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::client::{CompletionBackend, DispatchError};
use crate::escalation::{EscalationPolicy, UncertaintyPolicy};
use crate::turn::{SequenceId, Turn};

/// Diagnostic carried by the failure recorded for a cancelled submission.
const CANCELLED_DETAIL: &str = "submission cancelled before the reply arrived";

/// Channel capacity for session events.
const EVENT_CAPACITY: usize = 64;

/// Shown when the gateway answered successfully but with no text.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't get a response from the AI.";

/// Appended when the user accepts the mentor hand-off.
pub const ESCALATION_ACK: &str = "I've sent a request to our available mentors. Someone will \
connect with you shortly to help answer your question in more detail.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Ready to accept a submission.
    Idle,
    /// One prompt is in flight; submissions are rejected.
    Awaiting,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Awaiting => write!(f, "Awaiting"),
        }
    }
}

/// Why a submission was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Text was empty or whitespace only.
    EmptyInput,
    /// Another prompt is still in flight.
    AlreadyAwaiting,
}

/// Result of [`ChatSession::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing changed.
    Rejected(Rejection),
    /// The pending turn was replaced by the reply.
    Answered { turn: Turn, escalation_offered: bool },
    /// The pending turn was replaced by a fixed failure notice.
    Failed { turn: Turn, error: DispatchError },
}

/// Notifications for the UI shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TurnAppended(Turn),
    /// The pending turn with the same sequence id was replaced by `turn`.
    PendingResolved { turn: Turn },
    EscalationOffered,
    EscalationAccepted,
}

/// Owned copy of the session state for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub turns: Vec<Turn>,
    pub is_awaiting_response: bool,
    pub escalation_offered: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    turns: Vec<Turn>,
    next_sequence: SequenceId,
    /// Sequence id of the active pending turn.
    pending: Option<SequenceId>,
    escalation_offered: bool,
}

impl SessionState {
    fn next_id(&mut self) -> SequenceId {
        self.next_sequence += 1;
        self.next_sequence
    }

    fn phase(&self) -> SessionPhase {
        if self.pending.is_some() {
            SessionPhase::Awaiting
        } else {
            SessionPhase::Idle
        }
    }

    /// Swap the pending turn for `text` in place, keeping its sequence id.
    fn replace_pending(&mut self, pending_id: SequenceId, text: &str) -> Turn {
        let turn = Turn::assistant(pending_id, text);
        match self
            .turns
            .iter()
            .position(|t| t.sequence_id == pending_id && t.is_pending())
        {
            Some(index) => self.turns[index] = turn.clone(),
            None => {
                warn!(pending_id, "Pending turn missing at resolution; appending reply");
                self.turns.push(turn.clone());
            }
        }
        self.pending = None;
        turn
    }
}

/// One conversation, owned by the UI surface that created it.
pub struct ChatSession {
    state: Mutex<SessionState>,
    backend: Arc<dyn CompletionBackend>,
    policy: Box<dyn EscalationPolicy>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    /// New empty session using the default uncertainty policy.
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(SessionState::default()),
            backend,
            policy: Box::new(UncertaintyPolicy),
            events,
        }
    }

    pub fn with_policy(mut self, policy: impl EscalationPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            turns: state.turns.clone(),
            is_awaiting_response: state.pending.is_some(),
            escalation_offered: state.escalation_offered,
        }
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.lock().turns.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn escalation_offered(&self) -> bool {
        self.lock().escalation_offered
    }

    /// Submit user text and wait for the reply.
    ///
    /// Rejected without any state change when `text` is blank or another
    /// prompt is in flight. Otherwise appends the user turn and one pending
    /// turn, dispatches `text` to the backend, and replaces the pending turn
    /// with the reply or a fixed failure notice.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let pending_id = match self.begin(text) {
            Ok(id) => id,
            Err(rejection) => {
                debug!(?rejection, "Submission rejected");
                return SubmitOutcome::Rejected(rejection);
            }
        };

        let guard = PendingGuard {
            session: self,
            pending_id,
            armed: true,
        };
        let result = self.backend.complete(text).await;
        guard.resolve(result)
    }

    /// Acknowledge the mentor hand-off. No-op unless escalation is offered.
    ///
    /// Returns whether an acknowledgment was appended.
    pub fn accept_escalation(&self) -> bool {
        let mut state = self.lock();
        if !state.escalation_offered {
            return false;
        }
        let id = state.next_id();
        let ack = Turn::assistant(id, ESCALATION_ACK);
        state.turns.push(ack.clone());
        state.escalation_offered = false;
        drop(state);

        info!("Escalation accepted; mentor hand-off requested");
        self.publish(SessionEvent::TurnAppended(ack));
        self.publish(SessionEvent::EscalationAccepted);
        true
    }

    fn begin(&self, text: &str) -> Result<SequenceId, Rejection> {
        if text.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }

        let mut state = self.lock();
        if state.pending.is_some() {
            return Err(Rejection::AlreadyAwaiting);
        }

        let user_id = state.next_id();
        let user = Turn::user(user_id, text);
        let pending_id = state.next_id();
        let pending = Turn::pending(pending_id);
        state.turns.push(user.clone());
        state.turns.push(pending.clone());
        state.pending = Some(pending_id);
        drop(state);

        debug!(
            from = %SessionPhase::Idle,
            to = %SessionPhase::Awaiting,
            pending_id,
            "Session transition"
        );
        self.publish(SessionEvent::TurnAppended(user));
        self.publish(SessionEvent::TurnAppended(pending));
        Ok(pending_id)
    }

    fn resolve(
        &self,
        pending_id: SequenceId,
        result: Result<String, DispatchError>,
    ) -> SubmitOutcome {
        let mut state = self.lock();

        let outcome = match result {
            Ok(text) => {
                let text = if text.is_empty() {
                    FALLBACK_REPLY
                } else {
                    text.as_str()
                };
                let turn = state.replace_pending(pending_id, text);
                drop(state);

                // Policies may call back into the session.
                let triggered = self.policy.should_escalate(&turn);
                let newly_offered = if triggered {
                    let mut state = self.lock();
                    let was_offered = state.escalation_offered;
                    state.escalation_offered = true;
                    !was_offered
                } else {
                    false
                };

                self.publish(SessionEvent::PendingResolved { turn: turn.clone() });
                if newly_offered {
                    info!(sequence_id = turn.sequence_id, "Escalation offered");
                    self.publish(SessionEvent::EscalationOffered);
                }
                SubmitOutcome::Answered {
                    turn,
                    escalation_offered: triggered,
                }
            }
            Err(error) => {
                let turn = state.replace_pending(pending_id, error.reply_text());
                drop(state);

                warn!(kind = error.kind(), %error, "Completion failed");
                self.publish(SessionEvent::PendingResolved { turn: turn.clone() });
                SubmitOutcome::Failed { turn, error }
            }
        };

        debug!(
            from = %SessionPhase::Awaiting,
            to = %SessionPhase::Idle,
            pending_id,
            "Session transition"
        );
        outcome
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Resolves the pending turn of an in-flight `submit`, even when its future
/// is dropped before the backend answers.
struct PendingGuard<'a> {
    session: &'a ChatSession,
    pending_id: SequenceId,
    armed: bool,
}

impl PendingGuard<'_> {
    fn resolve(mut self, result: Result<String, DispatchError>) -> SubmitOutcome {
        self.armed = false;
        self.session.resolve(self.pending_id, result)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            info!(pending_id = self.pending_id, "Submission dropped in flight");
            self.session.resolve(
                self.pending_id,
                Err(DispatchError::Transport(CANCELLED_DETAIL.into())),
            );
        }
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ChatSession")
            .field("turns", &state.turns.len())
            .field("phase", &state.phase())
            .field("escalation_offered", &state.escalation_offered)
            .finish()
    }
}
