//! Chat session with mentor escalation.
//!
//! - [`session`]: the single-flight conversation state machine
//! - [`escalation`]: when to offer a hand-off to a human mentor
//! - [`client`]: the completion backend seam and its gateway HTTP client
//! - [`render`]: turns to display entries, markdown to HTML
//!
//! ```text
//! submit ─► user turn + pending turn ─► backend.complete ─► pending replaced
//!                                                             │
//!                                          reply ─► escalation policy ─► flag
//! ```

pub mod client;
pub mod escalation;
pub mod render;
pub mod session;
pub mod turn;

pub use client::{CompletionBackend, DispatchError, HttpGatewayClient};
pub use escalation::{should_escalate, EscalationPolicy, UncertaintyPolicy};
pub use render::{render, render_snapshot, DisplayEntry, DisplayModel, EntryKind};
pub use session::{
    ChatSession, Rejection, SessionEvent, SessionPhase, SessionSnapshot, SubmitOutcome,
};
pub use turn::{Role, SequenceId, Turn};
