//! Shared fixtures for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use taskflow_core::{ApiClient, MemoryCredentialStore, Taskflow};
use taskflow_types::{Session, User};
use wiremock::ResponseTemplate;

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn user() -> User {
    User {
        id: "u1".into(),
        email: "ada@example.com".into(),
        display_name: "Ada".into(),
    }
}

pub fn session(access: &str, refresh: &str) -> Session {
    Session::new(user(), access, refresh)
}

pub fn session_json(access: &str, refresh: &str) -> Value {
    json!({
        "user": {"id": "u1", "email": "ada@example.com", "name": "Ada"},
        "accessToken": access,
        "refreshToken": refresh,
    })
}

pub fn task_json(id: &str, title: &str, completed: bool) -> Value {
    json!({
        "_id": id,
        "title": title,
        "dueDate": "2030-01-01T09:00:00Z",
        "completed": completed,
    })
}

pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"}))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn client(base_url: &str, store: MemoryCredentialStore) -> ApiClient<MemoryCredentialStore> {
    ApiClient::new(base_url, Arc::new(store))
}

pub fn logged_in_client(base_url: &str) -> ApiClient<MemoryCredentialStore> {
    client(
        base_url,
        MemoryCredentialStore::with_session(session("tok1", "ref1")),
    )
}

pub fn app(base_url: &str, store: MemoryCredentialStore) -> Taskflow<MemoryCredentialStore> {
    Taskflow::new(client(base_url, store))
}
