//! Completion Gateway
//!
//! Stateless HTTP relay between chat clients and an upstream chat-completion
//! provider. Every request is forwarded as a single-message conversation using
//! server-held credentials, and every upstream outcome is folded into one
//! response shape:
//!
//! ```text
//! POST /api/chat  { "prompt": "..." }
//!     │
//!     ├─ upstream 2xx with choices ─────────► 200 { "response": "<text>" }
//!     ├─ upstream error object / non-2xx ───► 500 { "response": "Completion API error: ..." }
//!     ├─ upstream body not JSON ────────────► 500 { "response": "Completion API error: malformed ..." }
//!     └─ DNS / connect / timeout failure ───► 500 { "response": "Error contacting the completion API." }
//! ```
//!
//! No provider-specific field leaves this crate.

pub mod config;
pub mod envelope;
pub mod error;
pub mod relay;
pub mod server;

pub use config::GatewayConfig;
pub use envelope::ProviderEnvelope;
pub use error::{GatewayError, PromptResult};
pub use relay::{CompletionGateway, SharedGateway};
pub use server::{router, ChatRequest, ChatResponse};
