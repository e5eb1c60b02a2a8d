use std::net::SocketAddr;
use std::sync::{ Arc, Mutex };

use axum::{ extract::State, http::StatusCode, routing::post, Json, Router };
use chatrelay::client::{ ChatSession, ChatTransport, HttpTransport, SendOutcome, TransportError, FALLBACK_REPLY };
use chatrelay::llm::chat::groq::GroqChatClient;
use chatrelay::models::chat::{ ChatMessage, Role };
use chatrelay::server::api::{ router, AppState };
use serde_json::{ json, Value };

#[derive(Clone, Default)]
struct Upstream {
    requests: Arc<Mutex<Vec<Value>>>,
    fail: bool,
}

async fn fake_completions(State(upstream): State<Upstream>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    upstream.requests.lock().unwrap().push(body.clone());
    if upstream.fail {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": { "message": "Invalid API Key" } })));
    }

    let turns = body["messages"].as_array().map(|m| m.len()).unwrap_or_default();
    (StatusCode::OK, Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": format!("reply to {} messages", turns) },
            "finish_reason": "stop"
        }]
    })))
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn start_stack(upstream: Upstream) -> HttpTransport {
    let upstream_app = Router::new()
        .route("/openai/v1/chat/completions", post(fake_completions))
        .with_state(upstream);
    let upstream_addr = spawn(upstream_app).await;

    let client = GroqChatClient::new(
        "gsk_test".into(),
        None,
        Some(format!("http://{}", upstream_addr)),
    ).unwrap();
    let proxy_addr = spawn(router(AppState { client: Arc::new(client) })).await;

    HttpTransport::new(&format!("http://{}", proxy_addr))
}

#[tokio::test]
async fn conversation_flows_through_proxy() {
    let upstream = Upstream::default();
    let transport = start_stack(upstream.clone()).await;
    let mut session = ChatSession::new();

    session.set_input("Hello");
    assert_eq!(session.send_message(&transport).await.unwrap(), SendOutcome::Replied);
    session.set_input("And again");
    assert_eq!(session.send_message(&transport).await.unwrap(), SendOutcome::Replied);

    assert!(!session.is_loading());
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[1], ChatMessage::assistant("reply to 1 messages"));
    assert_eq!(transcript[3], ChatMessage::assistant("reply to 3 messages"));

    let requests = upstream.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let second = &requests[1];
    assert_eq!(second["model"], "llama-3.3-70b-versatile");
    assert_eq!(second["max_tokens"], 1024);
    assert_eq!(second["stream"], false);
    assert_eq!(second["messages"][2], json!({ "role": "user", "content": "And again" }));
}

#[tokio::test]
async fn upstream_failure_becomes_fallback_reply() {
    let upstream = Upstream { fail: true, ..Upstream::default() };
    let transport = start_stack(upstream).await;

    let err = transport.send(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, TransportError::Status(status) if status.as_u16() == 500));

    let mut session = ChatSession::new();
    session.set_input("hi");
    assert_eq!(session.send_message(&transport).await.unwrap(), SendOutcome::Failed);

    let last = session.transcript().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, FALLBACK_REPLY);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn unreachable_proxy_becomes_fallback_reply() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(&format!("http://{}", addr));
    let mut session = ChatSession::new();
    session.set_input("anyone there?");

    assert_eq!(session.send_message(&transport).await.unwrap(), SendOutcome::Failed);
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.transcript()[1].content, FALLBACK_REPLY);
}

#[tokio::test]
async fn proxy_reports_upstream_error_detail() {
    let upstream = Upstream { fail: true, ..Upstream::default() };
    let upstream_app = Router::new()
        .route("/openai/v1/chat/completions", post(fake_completions))
        .with_state(upstream);
    let upstream_addr = spawn(upstream_app).await;
    let client = GroqChatClient::new("gsk_test".into(), None, Some(format!("http://{}", upstream_addr))).unwrap();
    let proxy_addr = spawn(router(AppState { client: Arc::new(client) })).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/chat", proxy_addr))
        .json(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "upstream");
    assert!(body["error"].as_str().unwrap().contains("401"));
    assert!(body["error"].as_str().unwrap().contains("Invalid API Key"));
}
