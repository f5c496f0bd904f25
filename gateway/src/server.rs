//! HTTP surface of the gateway.
//!
//! | Route                 | Method | Purpose                               |
//! |-----------------------|--------|---------------------------------------|
//! | `/api/chat`           | POST   | relay a prompt                        |
//! | `/api/groq/chat`      | POST   | alias kept for older frontends        |
//! | `/health`             | GET    | liveness probe                        |
//! | anything else         | GET    | static frontend, when configured      |

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::relay::SharedGateway;

/// Reply for request bodies that are not `{ "prompt": string }`.
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid chat request.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// The only response shape the gateway ever produces on the chat routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

impl ChatResponse {
    fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

/// Build the gateway router.
///
/// Static file serving is mounted as the fallback so API routes always win.
pub fn router(gateway: SharedGateway) -> Router {
    let static_dir = gateway.config().static_dir.clone();

    let mut app = Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/groq/chat", post(handle_chat))
        .route("/health", get(health_check));

    if let Some(dir) = static_dir {
        info!(dir = %dir.display(), "Serving static frontend");
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(gateway)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handle_chat(
    State(gateway): State<SharedGateway>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected chat request body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse::new(INVALID_REQUEST_MESSAGE)),
            );
        }
    };

    match gateway.relay(&request.prompt).await {
        Ok(text) => (StatusCode::OK, Json(ChatResponse::new(text))),
        Err(err) => {
            warn!(kind = err.kind(), error = %err, "Chat relay failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse::new(err.client_message())),
            )
        }
    }
}
