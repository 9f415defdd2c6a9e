//! End-to-end tests of the HTTP surface against a temporary SQLite database.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use courier_chats::{
    BroadcastHub, Channel, ChatServices, DisabledMediaStore, NotificationEvent, Notifier,
};
use courier_config::{AuthConfig, DatabaseConfig};
use courier_database::{initialize_database, UpsertUserRequest, UserRepository};
use courier_gateway::{create_router, GatewayState, TokenVerifier};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "gateway-test-secret";
const BOUNDARY: &str = "courier-test-boundary";

struct TestApp {
    router: Router,
    hub: BroadcastHub,
    pool: SqlitePool,
    tokens: TokenVerifier,
    _temp_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("gateway.db").display()),
            max_connections: 4,
        };
        let pool = initialize_database(&config).await.unwrap();

        let hub = BroadcastHub::new(16);
        let notifier: Arc<dyn Notifier> = Arc::new(hub.clone());
        let services = ChatServices::new(pool.clone(), notifier, Arc::new(DisabledMediaStore));

        let auth = AuthConfig {
            jwt_secret: SECRET.to_string(),
            cookie_name: "auth".to_string(),
        };
        let state = GatewayState::new(services, hub.clone(), &auth);

        Self {
            router: create_router(state),
            hub,
            pool,
            tokens: TokenVerifier::new(SECRET),
            _temp_dir: temp_dir,
        }
    }

    fn token(&self, user_id: &str) -> String {
        self.tokens.issue(user_id, Duration::from_secs(600)).unwrap()
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn send(&self, sender: &str, fields: &[(&str, &str)]) -> (StatusCode, Value) {
        self.call(multipart_request(&self.token(sender), fields, &[]))
            .await
    }

    async fn get(&self, user: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
            .body(Body::empty())
            .unwrap();
        self.call(request).await
    }

    async fn send_json(&self, user: &str, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.call(request).await
    }

    async fn chat_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM chats")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

fn multipart_request(
    token: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = app.call(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;

    for uri in ["/api/contacts", "/api/messages/bob", "/ws"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = app.call(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let request = Request::builder()
        .uri("/api/contacts")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.call(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "401");

    let foreign = TokenVerifier::new("other-secret")
        .issue("alice", Duration::from_secs(600))
        .unwrap();
    let request = Request::builder()
        .uri("/api/contacts")
        .header(header::AUTHORIZATION, format!("Bearer {foreign}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_and_query_tokens_are_accepted() {
    let app = TestApp::new().await;
    let token = app.token("alice");

    let request = Request::builder()
        .uri("/api/contacts")
        .header(header::COOKIE, format!("theme=dark; auth={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri(format!("/api/contacts?token={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_send_then_page_history() {
    let app = TestApp::new().await;
    UserRepository::new(app.pool.clone())
        .upsert(&UpsertUserRequest {
            id: "alice".to_string(),
            name: Some("Alice".to_string()),
            email: None,
            mobile: None,
            photo: None,
        })
        .await
        .unwrap();

    let (status, sent) = app
        .send("alice", &[("receiver", "bob"), ("message", "hello bob")])
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["sender_id"], "alice");
    assert_eq!(sent["content"]["type"], "text");
    assert_eq!(sent["content"]["text"], "hello bob");
    assert_eq!(sent["seen"], false);
    let chat_id = sent["chat_id"].as_str().unwrap().to_string();

    for index in 0..11 {
        let text = format!("reply {index}");
        let (status, _) = app
            .send("bob", &[("receiver", "alice"), ("message", &text)])
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = app
        .send("mallory", &[("receiver", &chat_id), ("message", "let me in")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.chat_count().await, 1);

    let (status, first) = app.get("bob", "/api/messages/alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["total"], 12);
    assert_eq!(first["page"], 0);
    assert_eq!(first["result"].as_array().unwrap().len(), 10);
    assert_eq!(first["result"][0]["content"]["text"], "reply 10");

    let (status, second) = app
        .get("alice", &format!("/api/messages/{chat_id}?page=1"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = second["result"].as_array().unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[1]["content"]["text"], "hello bob");
    assert_eq!(second[1]["sender"]["id"], "alice");
    assert_eq!(second[1]["sender"]["name"], "Alice");
}

#[tokio::test]
async fn test_send_rejects_bad_input() {
    let app = TestApp::new().await;

    let (status, _) = app.send("alice", &[("message", "no receiver")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("alice", &[("receiver", "bob"), ("message", "")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("alice", &[("receiver", "alice"), ("message", "to myself")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.chat_count().await, 0);
}

#[tokio::test]
async fn test_attachment_without_media_store_is_bad_gateway() {
    let app = TestApp::new().await;
    let request = multipart_request(
        &app.token("alice"),
        &[("receiver", "bob")],
        &[("image", "cat.png", b"\x89PNG".as_slice())],
    );

    let (status, body) = app.call(request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "502");
    assert_eq!(app.chat_count().await, 0);
}

#[tokio::test]
async fn test_history_of_unknown_conversation_is_not_found() {
    let app = TestApp::new().await;

    let (status, _) = app.get("alice", "/api/messages/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.chat_count().await, 0);
}

#[tokio::test]
async fn test_mark_seen() {
    let app = TestApp::new().await;
    for text in ["one", "two"] {
        app.send("alice", &[("receiver", "bob"), ("message", text)])
            .await;
    }

    let mut alice_rx = app.hub.subscribe(&Channel::user("alice")).await;

    let (status, body) = app
        .send_json("bob", "PUT", "/api/messages/seen/alice", Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let notification = tokio::time::timeout(Duration::from_secs(1), alice_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.event, NotificationEvent::SeenResponse);
    assert_eq!(notification.payload.as_deref(), Some("bob"));

    let (status, body) = app
        .send_json("bob", "PUT", "/api/messages/seen/alice", Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);

    let (status, _) = app
        .send_json("bob", "PUT", "/api/messages/seen/carol", Value::Null)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_notifies_subscribers() {
    let app = TestApp::new().await;
    let mut bob_rx = app.hub.subscribe(&Channel::user("bob")).await;

    let (status, _) = app
        .send("alice", &[("receiver", "bob"), ("message", "ping")])
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let first = tokio::time::timeout(Duration::from_secs(1), bob_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.event, NotificationEvent::SendResponse);
    assert_eq!(first.payload.as_deref(), Some("alice"));

    let second = tokio::time::timeout(Duration::from_secs(1), bob_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.event, NotificationEvent::SeenResponse);
}

#[tokio::test]
async fn test_contacts_and_groups() {
    let app = TestApp::new().await;
    let mut bob_rx = app.hub.subscribe(&Channel::user("bob")).await;

    let (status, chat) = app
        .send_json("alice", "POST", "/api/contacts", json!({ "receiver": "bob" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(chat["is_group"], false);

    let notification = tokio::time::timeout(Duration::from_secs(1), bob_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.event, NotificationEvent::ContactResponse);

    // creating the same contact again reuses the chat
    let (_, again) = app
        .send_json("bob", "POST", "/api/contacts", json!({ "receiver": "alice" }))
        .await;
    assert_eq!(again["id"], chat["id"]);

    let (status, group) = app
        .send_json(
            "alice",
            "POST",
            "/api/groups",
            json!({ "name": "  Weekend  ", "users": ["bob", "carol"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(group["is_group"], true);
    assert_eq!(group["name"], "Weekend");
    assert_eq!(group["admin"], "alice");
    assert_eq!(group["participants"], json!(["bob", "carol", "alice"]));

    let (status, contacts) = app.get("alice", "/api/contacts").await;
    assert_eq!(status, StatusCode::OK);
    let contacts = contacts.as_array().unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0]["type"], "contact");
    assert_eq!(contacts[0]["id"], "bob");
    assert_eq!(contacts[1]["type"], "group");
    assert_eq!(contacts[1]["name"], "Weekend");

    let (status, _) = app
        .send_json("alice", "POST", "/api/groups", json!({ "name": "Solo", "users": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_json("alice", "POST", "/api/contacts", json!({ "receiver": " " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
