//! Shared fixtures for the router-level tests: an in-memory `AppState`, seeded
//! accounts, token helpers and a one-shot request driver.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use campus_site_api::{
    AppConfig, AppState, MockStorageService, Repositories, StorageState, create_router,
    auth::{Role, TokenSubject},
    models::UserRecord,
    repository::InMemoryUserRepository,
};
use chrono::Utc;
use serde_json::Value;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";

pub const ROOT_ID: i64 = 1;
pub const EDITOR_ID: i64 = 2;
pub const STUDENT_ID: i64 = 3;
pub const DORMANT_ID: i64 = 4;
pub const SECOND_SUPER_ID: i64 = 5;

/// A stored account whose password is `PASSWORD`. Low bcrypt cost keeps tests fast.
pub fn user(id: i64, name: &str, email: &str, role: &str, is_active: bool) -> UserRecord {
    UserRecord {
        id,
        name: name.to_string(),
        email: email.to_string(),
        password_hash: bcrypt::hash(PASSWORD, 4).expect("hash"),
        role: role.to_string(),
        is_active,
        email_verified_at: Some(Utc::now()),
    }
}

/// Principal superadmin, an editor, a student, a deactivated admin and a second superadmin.
pub fn seeded_users() -> Vec<UserRecord> {
    vec![
        user(ROOT_ID, "Root", "root@campus.edu", "superadmin", true),
        user(EDITOR_ID, "Editor", "editor@campus.edu", "admin", true),
        user(STUDENT_ID, "Student", "student@campus.edu", "student", true),
        user(DORMANT_ID, "Dormant", "dormant@campus.edu", "admin", false),
        user(SECOND_SUPER_ID, "Deputy", "deputy@campus.edu", "superadmin", true),
    ]
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub storage: Arc<MockStorageService>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(Repositories::in_memory(), MockStorageService::new())
    }

    pub fn with_repos(repos: Repositories) -> Self {
        Self::with_parts(repos, MockStorageService::new())
    }

    pub fn with_parts(repos: Repositories, storage: MockStorageService) -> Self {
        let repos = repos.with_users(Arc::new(InMemoryUserRepository::with_users(seeded_users())));
        let storage = Arc::new(storage);
        let state = AppState::new(
            repos,
            storage.clone() as StorageState,
            AppConfig::default(),
        );
        Self {
            router: create_router(state.clone()),
            state,
            storage,
        }
    }

    pub fn token(&self, id: i64, role: Role) -> String {
        self.state
            .tokens
            .issue(&TokenSubject {
                id,
                name: format!("user-{id}"),
                role,
            })
            .expect("token")
    }

    pub fn root_token(&self) -> String {
        self.token(ROOT_ID, Role::Superadmin)
    }

    pub fn editor_token(&self) -> String {
        self.token(EDITOR_ID, Role::Admin)
    }

    pub fn student_token(&self) -> String {
        self.token(STUDENT_ID, Role::Student)
    }

    /// Sends one request through a clone of the router and decodes the body as JSON
    /// (`Value::Null` when empty or not JSON).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("oneshot");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }
}

/// Builds a request with an optional bearer token and JSON body.
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Ids of a list response's items, in order.
pub fn ids(body: &Value) -> Vec<i64> {
    body["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect()
}
