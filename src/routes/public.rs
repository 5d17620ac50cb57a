use crate::{
    AppState,
    handlers::{auth, contact, content, regulation, system},
    models::{AdmissionStep, Course, Event, FaqItem, News, Program, Service},
    repository::Resource,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Registers the public list and detail routes of one content resource.
fn resource<R: Resource>(router: Router<AppState>, path: &str) -> Router<AppState> {
    router
        .route(path, get(content::list_public::<R>))
        .route(&format!("{path}/{{id}}"), get(content::show_public::<R>))
}

/// Public Router Module
///
/// Unauthenticated endpoints. Content handlers only ever read through the
/// repositories' public queries, which filter on `visible = 1`.
pub fn public_routes() -> Router<AppState> {
    let router = Router::new()
        // Diagnostics.
        .route("/health", get(system::health))
        .route("/ping", get(system::ping))
        .route("/db-test", get(system::db_test))
        // Login. The admin panel posts to its own alias.
        .route("/auth/login", post(auth::login))
        .route("/admin/login", post(auth::login))
        // Singletons.
        .route("/regulation", get(regulation::get_regulation))
        .route("/contact", get(contact::get_contact));

    let router = resource::<News>(router, "/news");
    let router = resource::<Event>(router, "/events");
    let router = resource::<Course>(router, "/courses");
    let router = resource::<Program>(router, "/programs");
    let router = resource::<AdmissionStep>(router, "/admissions");
    let router = resource::<Service>(router, "/services");
    resource::<FaqItem>(router, "/faq")
}
