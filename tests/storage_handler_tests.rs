mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;

use campus_site_api::{
    MockStorageService,
    repository::{InMemoryContactRepository, InMemoryRegulationRepository, Repositories},
    storage::{MAX_UPLOAD_BYTES, UploadKind},
};
use common::TestApp;
use serde_json::json;

const BOUNDARY: &str = "campus-test-boundary";

/// A single-file multipart request, optionally authenticated.
fn upload(
    uri: &str,
    token: Option<&str>,
    field: &str,
    filename: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_course_image_upload_success() {
    let app = TestApp::new();
    let token = app.editor_token();

    let (status, body) = app
        .send(upload(
            "/admin/courses/upload-image",
            Some(&token),
            "image",
            "Campus Photo.PNG",
            b"\x89PNG fake bytes",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/courses/"));
    assert!(url.ends_with(".png"));
    // 32 hex digits plus the extension; the client filename is discarded.
    let file = url.rsplit('/').next().unwrap();
    assert_eq!(file.len(), 32 + ".png".len());
    assert!(!url.contains("Campus"));

    let stored = app.storage.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].0, UploadKind::CourseImage);
}

#[tokio::test]
async fn test_upload_rejects_wrong_type() {
    let app = TestApp::new();
    let (status, body) = app
        .send(upload(
            "/admin/courses/upload-image",
            Some(&app.editor_token()),
            "image",
            "script.exe",
            b"MZ",
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("jpg"));
    assert!(app.storage.stored().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_missing_field() {
    let app = TestApp::new();
    let (status, body) = app
        .send(upload(
            "/admin/regulation/upload-pdf",
            Some(&app.editor_token()),
            "image",
            "rules.pdf",
            b"%PDF-1.4",
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file uploaded in field 'pdf'" }));
}

#[tokio::test]
async fn test_upload_rejects_oversize_file() {
    let app = TestApp::new();
    let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let (status, body) = app
        .send(upload(
            "/admin/regulation/upload-pdf",
            Some(&app.editor_token()),
            "pdf",
            "rules.pdf",
            &big,
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "The file exceeds the 5 MB limit");
}

#[tokio::test]
async fn test_upload_requires_staff() {
    let app = TestApp::new();

    let (status, _) = app
        .send(upload("/admin/courses/upload-image", None, "image", "a.png", b"x"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(upload(
            "/admin/courses/upload-image",
            Some(&app.student_token()),
            "image",
            "a.png",
            b"x",
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_storage_failure_is_500() {
    let app = TestApp::with_parts(Repositories::in_memory(), MockStorageService::new_failing());
    let (status, body) = app
        .send(upload(
            "/admin/contact/upload-image",
            Some(&app.editor_token()),
            "image",
            "hero.jpg",
            b"jpeg",
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Could not store the uploaded file");

    let (_, contact) = app.get("/contact", None).await;
    assert_eq!(contact["hero_image"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_contact_image_removed_when_save_fails() {
    let repos = Repositories::in_memory()
        .with_contact(Arc::new(InMemoryContactRepository::failing_writes()));
    let app = TestApp::with_repos(repos);

    let (status, body) = app
        .send(upload(
            "/admin/contact/upload-image",
            Some(&app.editor_token()),
            "image",
            "hero.png",
            b"png",
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(app.storage.stored().is_empty());
    let removed = app.storage.removed();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].starts_with("/uploads/contact/"));
}

#[tokio::test]
async fn test_regulation_pdf_removed_when_save_fails() {
    let repos = Repositories::in_memory()
        .with_regulation(Arc::new(InMemoryRegulationRepository::failing_pdf_updates()));
    let app = TestApp::with_repos(repos);

    let (status, _) = app
        .send(upload(
            "/admin/regulation/upload-pdf",
            Some(&app.editor_token()),
            "pdf",
            "rules.pdf",
            b"%PDF-1.4",
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.storage.stored().is_empty());
    assert_eq!(app.storage.removed().len(), 1);

    let (_, regulation) = app.get("/regulation", None).await;
    assert_eq!(regulation["pdf_path"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_regulation_pdf_updates_document() {
    let app = TestApp::new();
    let (status, body) = app
        .send(upload(
            "/admin/regulation/upload-pdf",
            Some(&app.editor_token()),
            "pdf",
            "rules.pdf",
            b"%PDF-1.4",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let path = body["pdf_path"].as_str().unwrap().to_string();
    assert!(path.starts_with("/uploads/regulation/"));

    let (_, regulation) = app.get("/regulation", None).await;
    assert_eq!(regulation["pdf_path"], path);
}

#[tokio::test]
async fn test_contact_image_survives_contact_update() {
    let app = TestApp::new();
    let token = app.editor_token();
    let (status, body) = app
        .send(upload(
            "/admin/contact/upload-image",
            Some(&token),
            "image",
            "hero.webp",
            b"RIFF",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let image = body["image_url"].clone();

    let (status, _) = app
        .put("/admin/contact", Some(&token), json!({ "address": "New address" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, contact) = app.get("/contact", None).await;
    assert_eq!(contact["hero_image"], image);
    assert_eq!(contact["address"], "New address");
}

#[tokio::test]
async fn test_non_multipart_body_is_400() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/admin/courses/upload-image",
            Some(&app.editor_token()),
            json!({ "image": "inline" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid upload"));
}
