//! Escalation trigger. Decides when to offer a hand-off to a human mentor.
//!
//! The policy is a pure predicate over the latest resolved assistant turn.
//! The session evaluates it exactly once per successful reply and never
//! revisits earlier turns; failure notices are not shown to it at all.

use crate::turn::{Role, Turn};

/// Phrase whose presence in a reply signals the assistant is out of its depth.
pub const UNCERTAINTY_MARKER: &str = "not sure";

/// Label of the affordance the UI shows once escalation is offered.
pub const ESCALATION_LABEL: &str = "Connect with a mentor";

/// Pluggable escalation rule.
///
/// Evaluated with no session lock held, so a policy may query the session.
pub trait EscalationPolicy: Send + Sync {
    fn should_escalate(&self, turn: &Turn) -> bool;
}

/// Default rule: the reply admits uncertainty.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncertaintyPolicy;

impl EscalationPolicy for UncertaintyPolicy {
    fn should_escalate(&self, turn: &Turn) -> bool {
        turn.role == Role::Assistant && should_escalate(&turn.text)
    }
}

/// Never offers escalation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEscalate;

impl EscalationPolicy for NeverEscalate {
    fn should_escalate(&self, _turn: &Turn) -> bool {
        false
    }
}

impl<F> EscalationPolicy for F
where
    F: Fn(&Turn) -> bool + Send + Sync,
{
    fn should_escalate(&self, turn: &Turn) -> bool {
        self(turn)
    }
}

/// True if the lowercased text contains [`UNCERTAINTY_MARKER`].
pub fn should_escalate(assistant_text: &str) -> bool {
    assistant_text.to_lowercase().contains(UNCERTAINTY_MARKER)
}
