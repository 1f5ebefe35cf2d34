//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};

use taskflow::storage::{KeyValueStore, MemoryStore};
use taskflow::{ClientConfig, Taskflow};

pub const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.alice";

pub fn base_url(server: &ServerGuard) -> String {
    format!("{}/api", server.url())
}

pub fn task_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{} description", title),
        "status": "NEW",
        "priority": "MEDIUM",
        "assignedToId": null,
        "assignedToName": null,
        "createdById": 1,
        "createdByName": "Alice Doe",
        "createdDate": "2024-05-01T09:00:00",
        "updatedDate": format!("2024-05-{:02}T09:00:00", id),
        "dueDate": null
    })
}

pub fn auth_json(token: &str) -> Value {
    json!({
        "token": token,
        "type": "Bearer",
        "id": 1,
        "username": "alice",
        "email": "alice@example.com",
        "fullName": "Alice Doe"
    })
}

/// App over `server` with an in-memory session store.
pub fn app(server: &ServerGuard) -> (Taskflow, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let app = Taskflow::with_storage(
        ClientConfig::new(base_url(server)),
        storage.clone() as Arc<dyn KeyValueStore>,
    )
    .expect("valid config");
    (app, storage)
}

pub async fn login_mock(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/api/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"username": "alice", "password": "secret"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(auth_json(TOKEN).to_string())
        .create_async()
        .await
}

/// App over `server`, already signed in as alice.
pub async fn signed_in_app(server: &mut ServerGuard) -> (Taskflow, Arc<MemoryStore>) {
    let mock = login_mock(server).await;
    let (app, storage) = app(server);
    app.login("alice", "secret").await.expect("login succeeds");
    mock.remove_async().await;
    (app, storage)
}

pub async fn list_mock(server: &mut ServerGuard, body: Value) -> Mock {
    server
        .mock("GET", "/api/tasks")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}
