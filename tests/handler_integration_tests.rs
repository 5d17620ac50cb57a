mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use campus_site_api::repository::{InMemoryHealthProbe, InMemoryRegulationRepository, Repositories};
use common::{TestApp, ids, request};
use serde_json::{Value, json};

async fn create(app: &TestApp, path: &str, body: Value) -> i64 {
    let (status, created) = app.post(path, Some(&app.editor_token()), body).await;
    assert_eq!(status, StatusCode::CREATED, "create {path}: {created}");
    created["id"].as_i64().expect("id")
}

// --- Content CRUD ---

#[tokio::test]
async fn test_news_create_then_read_back_normalized() {
    let app = TestApp::new();
    let token = app.editor_token();

    let (status, body) = app
        .post(
            "/admin/news",
            Some(&token),
            json!({
                "title": " Open day ",
                "body": "Doors open at nine",
                "visible": "1",
                "order": "-3"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "News created");
    let id = body["id"].as_i64().unwrap();

    let (status, news) = app.get(&format!("/admin/news/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(news["title"], "Open day");
    assert_eq!(news["visible"], 1);
    assert_eq!(news["order"], 0);
    assert_eq!(news["created_by"], 2);
}

#[tokio::test]
async fn test_public_listing_hides_invisible_rows_and_orders() {
    let app = TestApp::new();

    let late = create(&app, "/admin/services", json!({ "title": "Library", "order": 5 })).await;
    let hidden = create(&app, "/admin/services", json!({ "title": "Lab", "visible": false })).await;
    let first = create(&app, "/admin/services", json!({ "title": "Cafeteria", "order": 1 })).await;
    let tie = create(&app, "/admin/services", json!({ "title": "Gym", "order": 1 })).await;

    let (status, public) = app.get("/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&public), vec![first, tie, late]);
    assert_eq!(public["page"], 1);
    assert_eq!(public["limit"], 50);

    let (_, admin) = app.get("/admin/services", Some(&app.editor_token())).await;
    assert_eq!(ids(&admin), vec![hidden, first, tie, late]);
    assert_eq!(admin["limit"], 100);

    // Public listing is the admin listing filtered by visibility.
    let admin_visible: Vec<i64> = admin["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| item["visible"] == 1)
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(admin_visible, ids(&public));
}

#[tokio::test]
async fn test_hidden_row_is_not_found_publicly() {
    let app = TestApp::new();
    let id = create(
        &app,
        "/admin/faq",
        json!({ "question": "Is parking free?", "visible": 0 }),
    )
    .await;

    let (status, body) = app.get(&format!("/faq/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "FAQ item not found" }));

    let (status, _) = app.get(&format!("/admin/faq/{id}"), Some(&app.editor_token())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_news_pagination_defaults_and_windows() {
    let app = TestApp::new();
    for n in 0..25 {
        create(
            &app,
            "/admin/news",
            json!({ "title": format!("Item {n}"), "body": "text", "order": n }),
        )
        .await;
    }

    let (_, page1) = app.get("/news", None).await;
    assert_eq!(page1["limit"], 20);
    assert_eq!(ids(&page1).len(), 20);

    let (_, page2) = app.get("/news?page=2", None).await;
    assert_eq!(ids(&page2).len(), 5);

    let (_, odd) = app.get("/news?page=abc&limit=0", None).await;
    assert_eq!(odd["page"], 1);
    assert_eq!(odd["limit"], 1);
    assert_eq!(ids(&odd).len(), 1);
}

#[tokio::test]
async fn test_course_category_filter() {
    let app = TestApp::new();
    let tech = create(
        &app,
        "/admin/courses",
        json!({ "title": "Robotics", "category": "tech" }),
    )
    .await;
    create(&app, "/admin/courses", json!({ "title": "Choir", "category": "arts" })).await;

    let (status, body) = app.get("/courses?category=tech", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "tech");
    assert_eq!(ids(&body), vec![tech]);

    let (_, all) = app.get("/courses", None).await;
    assert_eq!(all["category"], Value::Null);
    assert_eq!(ids(&all).len(), 2);

    // Only filterable listings carry the key at all.
    let (_, events) = app.get("/events", None).await;
    assert!(events.get("category").is_none());
}

#[tokio::test]
async fn test_update_replaces_record_and_missing_is_404() {
    let app = TestApp::new();
    let token = app.editor_token();
    let id = create(
        &app,
        "/admin/programs",
        json!({ "name": "Nursing", "level": "Bachelor", "order": 3 }),
    )
    .await;

    let (status, body) = app
        .put(
            &format!("/admin/programs/{id}"),
            Some(&token),
            json!({ "name": "Nursing (BSc)", "visible": "off" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Program updated");

    let (_, program) = app.get(&format!("/admin/programs/{id}"), Some(&token)).await;
    assert_eq!(program["name"], "Nursing (BSc)");
    assert_eq!(program["level"], Value::Null);
    assert_eq!(program["visible"], 0);
    assert_eq!(program["order"], 0);

    let (status, body) = app
        .put("/admin/programs/999", Some(&token), json!({ "name": "Ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Program not found");
}

#[tokio::test]
async fn test_delete_then_gone() {
    let app = TestApp::new();
    let token = app.editor_token();
    let id = create(&app, "/admin/admissions", json!({ "title": "Apply online" })).await;

    let (status, _) = app.delete(&format!("/admin/admissions/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&format!("/admin/admissions/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/admissions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_json() {
    let app = TestApp::new();
    let token = app.editor_token();

    let (status, body) = app.post("/admin/news", Some(&token), json!({ "title": "No body" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "body is required" }));

    let (status, body) = app
        .post(
            "/admin/events",
            Some(&token),
            json!({ "title": "Fair", "starts_at": "someday" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "starts_at is not a valid date");

    let broken = Request::builder()
        .method(Method::POST)
        .uri("/admin/news")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.get("/news/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_event_dates_round_trip() {
    let app = TestApp::new();
    let id = create(
        &app,
        "/admin/events",
        json!({
            "title": "Science fair",
            "starts_at": "2026-11-02 10:00:00",
            "ends_at": "2026-11-02T16:30:00Z",
            "location": "Main hall"
        }),
    )
    .await;

    let (_, event) = app.get(&format!("/events/{id}"), None).await;
    assert!(event["starts_at"].as_str().unwrap().starts_with("2026-11-02T10:00:00"));
    assert!(event["ends_at"].as_str().unwrap().starts_with("2026-11-02T16:30:00"));
}

// --- Regulation ---

#[tokio::test]
async fn test_regulation_outline_visibility() {
    let app = TestApp::new();
    let token = app.editor_token();

    let (status, _) = app
        .put("/admin/regulation", Some(&token), json!({ "content_html": "<p>Rules</p>" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let shown = create(
        &app,
        "/admin/regulation/sections",
        json!({ "title": "Conduct", "order": 1 }),
    )
    .await;
    let hidden = create(
        &app,
        "/admin/regulation/sections",
        json!({ "title": "Draft", "visible": false }),
    )
    .await;
    create(
        &app,
        "/admin/regulation/items",
        json!({ "section_id": shown, "content": "Be kind", "order": 2 }),
    )
    .await;
    create(
        &app,
        "/admin/regulation/items",
        json!({ "section_id": shown, "content": "Internal note", "visible": 0 }),
    )
    .await;
    create(
        &app,
        "/admin/regulation/items",
        json!({ "section_id": hidden, "content": "Not yet" }),
    )
    .await;

    let (status, public) = app.get("/regulation", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["content_html"], "<p>Rules</p>");
    let sections = public["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["title"], "Conduct");
    assert_eq!(sections[0]["items"].as_array().unwrap().len(), 1);
    assert_eq!(sections[0]["items"][0]["content"], "Be kind");

    let (_, admin) = app.get("/admin/regulation", Some(&token)).await;
    let sections = admin["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["id"], hidden);
    assert_eq!(sections[1]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_regulation_item_requires_existing_section() {
    let app = TestApp::new();
    let token = app.editor_token();

    let (status, body) = app
        .post("/admin/regulation/items", Some(&token), json!({ "content": "Orphan" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "section_id and content are required");

    let (status, body) = app
        .post(
            "/admin/regulation/items",
            Some(&token),
            json!({ "section_id": 42, "content": "Orphan" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Section does not exist");

    let (status, body) = app
        .post("/admin/regulation/sections", Some(&token), json!({ "description": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "title is required");
}

#[tokio::test]
async fn test_section_delete_removes_items() {
    let app = TestApp::new();
    let token = app.editor_token();
    let section = create(&app, "/admin/regulation/sections", json!({ "title": "Exams" })).await;
    let item = create(
        &app,
        "/admin/regulation/items",
        json!({ "section_id": section, "content": "No phones" }),
    )
    .await;

    let (status, _) = app
        .delete(&format!("/admin/regulation/sections/{section}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, admin) = app.get("/admin/regulation", Some(&token)).await;
    assert!(admin["sections"].as_array().unwrap().is_empty());

    let (status, _) = app
        .delete(&format!("/admin/regulation/items/{item}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_section_delete_leaves_everything() {
    let repos = Repositories::in_memory()
        .with_regulation(Arc::new(InMemoryRegulationRepository::failing_section_deletes()));
    let app = TestApp::with_repos(repos);
    let token = app.editor_token();

    let section = create(&app, "/admin/regulation/sections", json!({ "title": "Exams" })).await;
    create(
        &app,
        "/admin/regulation/items",
        json!({ "section_id": section, "content": "No phones" }),
    )
    .await;

    let (status, body) = app
        .delete(&format!("/admin/regulation/sections/{section}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));

    let (_, admin) = app.get("/admin/regulation", Some(&token)).await;
    let sections = admin["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["items"].as_array().unwrap().len(), 1);
}

// --- Contact ---

#[tokio::test]
async fn test_contact_update_cleans_lists() {
    let app = TestApp::new();
    let token = app.editor_token();

    let (status, _) = app
        .put(
            "/admin/contact",
            Some(&token),
            json!({
                "phones": [" 555-0100 ", "", 5550101],
                "emails": ["info@campus.edu"],
                "address": "1 College Rd",
                "socials": [
                    { "label": "Instagram", "url": "https://instagram.com/campus" },
                    { "label": "Broken" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, contact) = app.get("/contact", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contact["phones"], json!(["555-0100", "5550101"]));
    assert_eq!(contact["address"], "1 College Rd");
    assert_eq!(contact["schedule"], "");
    assert_eq!(contact["socials"].as_array().unwrap().len(), 1);
}

// --- System ---

#[tokio::test]
async fn test_ping_and_db_test() {
    let app = TestApp::new();

    let (status, body) = app.get("/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "pong" }));

    let (status, body) = app.get("/db-test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "db": "ok", "row": 1 }));

    let down = TestApp::with_repos(
        Repositories::in_memory().with_health(Arc::new(InMemoryHealthProbe::unreachable())),
    );
    let (status, body) = down.get("/db-test", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["db"], "error");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_cors_headers_and_preflight() {
    let app = TestApp::new();

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/admin/news")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), preflight)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::VARY], "Origin");

    let foreign = Request::builder()
        .uri("/ping")
        .header(header::ORIGIN, "https://elsewhere.test")
        .body(Body::empty())
        .unwrap();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), foreign)
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );

    // Error responses are decorated too.
    let (status, _) = app.send(request(Method::GET, "/admin/news", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
