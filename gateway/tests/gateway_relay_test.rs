//! Integration tests for the completion gateway.
//!
//! A stub upstream provider is served by axum on an ephemeral port; the
//! gateway router is driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    routing::post,
    Router,
};
use completion_gateway::{
    error::TRANSPORT_FAILURE_MESSAGE, router, ChatResponse, CompletionGateway, GatewayConfig,
    GatewayError,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Stub upstream ────────────────────────────────────────────────────────────

/// What the stub saw: authorization header and decoded JSON body.
#[derive(Debug, Clone)]
struct Captured {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: &'static str,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn stub_completions(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    let captured = Captured {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state.captured.lock().unwrap().push(captured);
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body,
    )
}

/// Serve a stub provider answering every request with `status` / `body`.
/// Returns the completions URL and the capture log.
async fn spawn_upstream(
    status: StatusCode,
    body: &'static str,
) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        body,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/openai/v1/chat/completions", post(stub_completions))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (
        format!("http://{addr}/openai/v1/chat/completions"),
        captured,
    )
}

/// A URL nothing listens on.
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/openai/v1/chat/completions")
}

fn gateway_for(url: &str) -> CompletionGateway {
    CompletionGateway::new(GatewayConfig::new(url, "sk-server-held")).unwrap()
}

async fn post_chat(app: Router, path: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn prompt_body(prompt: &str) -> Body {
    Body::from(json!({ "prompt": prompt }).to_string())
}

const SUCCESS_BODY: &str =
    r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there!"}}]}"#;

// ── relay() ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn relay_returns_first_choice_text() {
    let (url, _) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let text = gateway_for(&url).relay("hello").await.unwrap();
    assert_eq!(text, "Hi there!");
}

#[tokio::test]
async fn relay_sends_server_credential_and_single_message() {
    let (url, captured) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    gateway_for(&url).relay("what is ownership?").await.unwrap();

    let seen = captured.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer sk-server-held"));
    assert_eq!(
        seen[0].body,
        json!({
            "model": "llama-3.1-8b-instant",
            "messages": [{ "role": "user", "content": "what is ownership?" }]
        })
    );
}

#[tokio::test]
async fn relay_is_stateless_across_calls() {
    let (url, captured) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let gateway = gateway_for(&url);
    gateway.relay("first").await.unwrap();
    gateway.relay("second").await.unwrap();

    let seen = captured.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    let messages = seen[1].body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1, "no history may be forwarded");
    assert_eq!(messages[0]["content"], "second");
}

#[tokio::test]
async fn relay_handles_empty_prompt() {
    let (url, captured) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let text = gateway_for(&url).relay("").await.unwrap();
    assert_eq!(text, "Hi there!");
    assert_eq!(captured.lock().unwrap()[0].body["messages"][0]["content"], "");
}

#[tokio::test]
async fn relay_empty_choices_yields_empty_text() {
    let (url, _) = spawn_upstream(StatusCode::OK, r#"{"choices":[]}"#).await;
    assert_eq!(gateway_for(&url).relay("hi").await.unwrap(), "");
}

#[tokio::test]
async fn relay_error_object_on_200_is_provider_error() {
    let (url, _) =
        spawn_upstream(StatusCode::OK, r#"{"error":{"message":"rate limited"}}"#).await;
    let err = gateway_for(&url).relay("hi").await.unwrap_err();
    assert!(matches!(err, GatewayError::Provider(ref m) if m == "rate limited"));
}

#[tokio::test]
async fn relay_non_2xx_is_provider_error() {
    let (url, _) = spawn_upstream(
        StatusCode::UNAUTHORIZED,
        r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#,
    )
    .await;
    let err = gateway_for(&url).relay("hi").await.unwrap_err();
    assert!(matches!(err, GatewayError::Provider(ref m) if m == "Invalid API Key"));
}

#[tokio::test]
async fn relay_garbage_body_is_malformed() {
    let (url, _) = spawn_upstream(StatusCode::OK, "not json at all").await;
    let err = gateway_for(&url).relay("hi").await.unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)));
}

#[tokio::test]
async fn relay_connection_refused_is_transport_error() {
    let url = refused_url().await;
    let err = gateway_for(&url).relay("hi").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}

// ── HTTP surface ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_route_success_is_200_with_response_field() {
    let (url, _) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let app = router(gateway_for(&url).shared());

    let (status, body) = post_chat(app, "/api/chat", prompt_body("hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "response": "Hi there!" }));
}

#[tokio::test]
async fn legacy_route_alias_works() {
    let (url, _) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let app = router(gateway_for(&url).shared());

    let (status, body) = post_chat(app, "/api/groq/chat", prompt_body("hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Hi there!");
}

#[tokio::test]
async fn provider_error_is_500_and_mentions_upstream_message() {
    let (url, _) =
        spawn_upstream(StatusCode::OK, r#"{"error":{"message":"rate limited"}}"#).await;
    let app = router(gateway_for(&url).shared());

    let (status, body) = post_chat(app, "/api/chat", prompt_body("hello")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let reply: ChatResponse = serde_json::from_value(body).unwrap();
    assert!(reply.response.contains("rate limited"), "got {:?}", reply.response);
}

#[tokio::test]
async fn transport_error_is_500_with_fixed_message() {
    let url = refused_url().await;
    let app = router(gateway_for(&url).shared());

    let (status, body) = post_chat(app, "/api/chat", prompt_body("hello")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["response"], TRANSPORT_FAILURE_MESSAGE);
}

#[tokio::test]
async fn invalid_request_body_gets_normalized_failure() {
    let (url, captured) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let app = router(gateway_for(&url).shared());

    let (status, body) = post_chat(app, "/api/chat", Body::from(r#"{"text":"hi"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["response"].is_string());
    assert!(captured.lock().unwrap().is_empty(), "upstream must not be called");
}

#[tokio::test]
async fn client_supplied_credentials_are_not_forwarded() {
    let (url, captured) = spawn_upstream(StatusCode::OK, SUCCESS_BODY).await;
    let app = router(gateway_for(&url).shared());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Bearer client-key")
                .body(prompt_body("hello"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = captured.lock().unwrap().clone();
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer sk-server-held"));
}

#[tokio::test]
async fn health_check_ok() {
    let app = router(gateway_for("http://127.0.0.1:9/unused").shared());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn unknown_path_is_404_without_static_dir() {
    let app = router(gateway_for("http://127.0.0.1:9/unused").shared());
    let response = app
        .oneshot(Request::builder().uri("/mentors").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_dir_serves_assets_and_spa_fallback() {
    let dist = tempfile::TempDir::new().unwrap();
    std::fs::write(dist.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
    std::fs::write(dist.path().join("app.js"), "console.log('app')").unwrap();

    let config = GatewayConfig::new("http://127.0.0.1:9/unused", "sk").with_static_dir(dist.path());
    let app = router(CompletionGateway::new(config).unwrap().shared());

    let asset = app
        .clone()
        .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(asset.status(), StatusCode::OK);
    let bytes = to_bytes(asset.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"console.log('app')");

    let deep_link = app
        .oneshot(
            Request::builder()
                .uri("/dashboard/assignments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deep_link.status(), StatusCode::OK);
    let bytes = to_bytes(deep_link.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("root"));
}
