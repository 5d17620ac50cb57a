mod common;

use std::sync::Arc;

use campus_site_api::{
    AppConfig, AppState, MockStorageService, Repositories, StorageState, create_router,
    models::LoginResponse, repository::InMemoryUserRepository,
};
use common::{PASSWORD, seeded_users};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app(config: AppConfig) -> TestApp {
    let repos = Repositories::in_memory()
        .with_users(Arc::new(InMemoryUserRepository::with_users(seeded_users())));
    let storage = Arc::new(MockStorageService::new()) as StorageState;
    let router = create_router(AppState::new(repos, storage, config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app(AppConfig::default()).await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_news_lifecycle() {
    let app = spawn_app(AppConfig::default()).await;
    let client = reqwest::Client::new();

    // Login
    let login: LoginResponse = client
        .post(format!("{}/auth/login", app.address))
        .json(&json!({ "email": "editor@campus.edu", "password": PASSWORD }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Create hidden, then publish
    let created: Value = client
        .post(format!("{}/admin/news", app.address))
        .bearer_auth(&login.token)
        .json(&json!({ "title": "Enrollment opens", "body": "Monday", "visible": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let list: Value = client
        .get(format!("{}/news", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list["items"].as_array().unwrap().is_empty());

    let resp = client
        .put(format!("{}/admin/news/{}", app.address, id))
        .bearer_auth(&login.token)
        .json(&json!({ "title": "Enrollment opens", "body": "Monday", "visible": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let list: Value = client
        .get(format!("{}/news", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["items"][0]["id"], id);
}

#[tokio::test]
async fn test_base_path_prefix() {
    let config = AppConfig {
        base_path: "/api".to_string(),
        ..AppConfig::default()
    };
    let app = spawn_app(config).await;
    let client = reqwest::Client::new();

    let ok = client
        .get(format!("{}/api/ping", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);

    let outside = client
        .get(format!("{}/ping", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(outside.status(), 404);
    let body: Value = outside.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Not found" }));
}
