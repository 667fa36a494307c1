mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{MockClock, ScriptedTransport, gateway, rate_limited};
use serde_json::{Value, json};
use socratic::{
    chat::client::{CompletionResponse, FinishReason, ProviderError},
    server::{AppState, InMemorySessionStore, SessionStore, router, routes::ChatReply},
};
use tower::ServiceExt;

const SYSTEM_PROMPT: &str = "You are a Socratic tutor.";

fn app(
    transport: Arc<ScriptedTransport>,
    default_credential: Option<&str>,
) -> (Router, Arc<InMemorySessionStore>) {
    let sessions = Arc::new(InMemorySessionStore::new());
    let state = AppState {
        gateway: gateway(transport, Arc::new(MockClock::default()), default_credential),
        sessions: sessions.clone(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        chat_timeout: Duration::from_secs(5),
    };

    (router(Arc::new(state)), sessions)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let value = match body.is_empty() {
        true => Value::Null,
        false => serde_json::from_slice(&body).unwrap(),
    };

    (status, value)
}

fn post_chat(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/socratic_chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app(ScriptedTransport::new([]), None);

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn chat_assigns_session_and_persists_turns() {
    let transport = ScriptedTransport::new([Ok(CompletionResponse::text(
        "What do you think pulls the apple down?",
        FinishReason::Stop,
    ))]);
    let (app, sessions) = app(transport.clone(), Some("server-key"));

    let (status, body) = send(
        &app,
        post_chat(json!({
            "message": "What is gravity?",
            "history": [{ "role": "user", "content": "What is gravity?" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reply: ChatReply = serde_json::from_value(body).unwrap();
    assert_eq!(reply.reply, "What do you think pulls the apple down?");
    assert!(!reply.session_id.is_empty());

    // the pending message echoed in history is not sent twice
    let (_, request) = transport.last_request().unwrap();
    assert!(request.history.is_empty());
    assert_eq!(request.query, "What is gravity?");
    assert_eq!(request.system_instruction.as_deref(), Some(SYSTEM_PROMPT));

    let session = sessions.get(&reply.session_id).await.unwrap().unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.title, "What is gravity?");
}

#[tokio::test]
async fn chat_keeps_existing_session_id_and_uses_caller_key() {
    let transport = ScriptedTransport::new([Ok(CompletionResponse::text("Why?", FinishReason::Stop))]);
    let (app, sessions) = app(transport.clone(), None);

    let (status, body) = send(
        &app,
        post_chat(json!({
            "message": "Because it falls",
            "history": [
                { "role": "user", "content": "What is gravity?" },
                { "role": "assistant", "content": "What do you observe?" }
            ],
            "sessionId": "session-1",
            "apiKey": "user-key"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "session-1");
    assert_eq!(transport.last_request().unwrap().0, "user-key");
    assert_eq!(
        sessions.get("session-1").await.unwrap().unwrap().messages.len(),
        4
    );
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    let transport = ScriptedTransport::new([]);
    let (app, _) = app(transport.clone(), Some("key"));

    let (status, body) = send(&app, post_chat(json!({ "message": "  " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "InvalidRequest");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn missing_key_is_unauthorized() {
    let (app, _) = app(ScriptedTransport::new([]), None);

    let (status, body) = send(&app, post_chat(json!({ "message": "hello" }))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["category"], "MissingCredential");
    assert!(body["error"].as_str().unwrap().contains("API Key"));
}

#[tokio::test]
async fn exhausted_rate_limit_is_too_many_requests() {
    let transport = ScriptedTransport::new((0..5).map(|_| Err(rate_limited())));
    let (app, sessions) = app(transport.clone(), Some("key"));

    let (status, body) = send(&app, post_chat(json!({ "message": "hello" }))).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["category"], "RateLimited");
    assert_eq!(transport.calls(), 5);
    assert!(sessions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn billing_errors_map_to_payment_required() {
    let transport = ScriptedTransport::new([Err(ProviderError::new(
        Some(403),
        "[403 Forbidden] Please enable billing on project #1 by visiting the billing account page.",
    ))]);
    let (app, _) = app(transport, Some("key"));

    let (status, body) = send(&app, post_chat(json!({ "message": "hello" }))).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Billing account issue with the provided API Key.");
}

#[tokio::test]
async fn sessions_can_be_listed_fetched_and_deleted() {
    let (app, sessions) = app(ScriptedTransport::new([]), None);
    sessions
        .save("s1", vec![socratic::chat::ChatTurn::user("Why is the sky blue?")])
        .await
        .unwrap();

    let (status, body) = send(&app, get("/socratic_sessions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["sessionId"], "s1");
    assert_eq!(body[0]["title"], "Why is the sky blue?");

    let (status, body) = send(&app, get("/socratic_sessions/s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["content"], "Why is the sky blue?");
    assert_eq!(body["messages"][0]["role"], "user");

    let delete = Request::builder()
        .method("DELETE")
        .uri("/socratic_sessions/s1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get("/socratic_sessions/s1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn null_history_counts_as_empty() {
    let transport = ScriptedTransport::new([Ok(CompletionResponse::text("Why?", FinishReason::Stop))]);
    let (app, _) = app(transport.clone(), Some("key"));

    let (status, body) = send(&app, post_chat(json!({ "message": "hi", "history": null }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Why?");
    assert!(transport.last_request().unwrap().1.history.is_empty());
}

#[tokio::test]
async fn mistyped_body_is_invalid_request() {
    let transport = ScriptedTransport::new([]);
    let (app, _) = app(transport.clone(), Some("key"));

    let bodies = [
        json!({ "message": 5 }),
        json!({ "message": "hi", "history": "x" }),
        json!({ "history": "x" }),
    ];

    for body in bodies {
        let (status, response) = send(&app, post_chat(body.clone())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "for {body}");
        assert_eq!(response["category"], "InvalidRequest", "for {body}");
        assert!(response["error"].is_string(), "for {body}");
    }

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn non_json_body_is_invalid_request() {
    let (app, _) = app(ScriptedTransport::new([]), Some("key"));

    let request = Request::builder()
        .method("POST")
        .uri("/socratic_chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "InvalidRequest");
}
