//! Render adapter: session turns to a flat display list.
//!
//! The list is in turn order and never re-sorted. Assistant text is treated
//! as markdown and rendered to HTML; raw HTML inside it is shown as text.

use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;

use crate::session::SessionSnapshot;
use crate::turn::{Role, SequenceId, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    User,
    Assistant,
    Loading,
}

impl EntryKind {
    /// Style class for the entry's container.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::User => "user-msg",
            Self::Assistant => "ai-msg",
            Self::Loading => "loading-msg",
        }
    }
}

impl From<Role> for EntryKind {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
            Role::Pending => Self::Loading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEntry {
    /// Stable key; the turn's sequence id.
    pub key: SequenceId,
    pub kind: EntryKind,
    pub text: String,
    /// Rendered markdown, assistant entries only.
    pub html: Option<String>,
}

impl DisplayEntry {
    pub fn from_turn(turn: &Turn) -> Self {
        let kind = EntryKind::from(turn.role);
        let html = match kind {
            EntryKind::Assistant => Some(markdown_to_html(&turn.text)),
            EntryKind::User | EntryKind::Loading => None,
        };
        Self {
            key: turn.sequence_id,
            kind,
            text: turn.text.clone(),
            html,
        }
    }
}

pub fn render(turns: &[Turn]) -> Vec<DisplayEntry> {
    turns.iter().map(DisplayEntry::from_turn).collect()
}

/// Display list plus whether to show the mentor affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayModel {
    pub entries: Vec<DisplayEntry>,
    pub show_escalation: bool,
    pub input_enabled: bool,
}

pub fn render_snapshot(snapshot: &SessionSnapshot) -> DisplayModel {
    DisplayModel {
        entries: render(&snapshot.turns),
        show_escalation: snapshot.escalation_offered,
        input_enabled: !snapshot.is_awaiting_response,
    }
}

pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
