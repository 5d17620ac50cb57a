use crate::{
    AppState,
    handlers::{auth, contact, content, regulation, uploads},
    models::{AdmissionStep, Course, Event, FaqItem, News, Program, Service},
    repository::Resource,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Registers the full CRUD surface of one content resource under `/admin`.
fn resource<R: Resource>(router: Router<AppState>, path: &str) -> Router<AppState> {
    router
        .route(
            path,
            get(content::list_admin::<R>).post(content::create::<R>),
        )
        .route(
            &format!("{path}/{{id}}"),
            get(content::show_admin::<R>)
                .put(content::update::<R>)
                .delete(content::delete::<R>),
        )
}

/// Admin Router Module
///
/// Content administration for staff. The whole router is wrapped by the staff gate
/// in `create_router`, so every handler here can rely on an `AuthUser`.
pub fn admin_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/admin/whoami", get(auth::whoami))
        // Regulation document and outline.
        .route(
            "/admin/regulation",
            get(regulation::get_admin_regulation).put(regulation::update_content),
        )
        .route("/admin/regulation/sections", post(regulation::create_section))
        .route(
            "/admin/regulation/sections/{id}",
            put(regulation::update_section).delete(regulation::delete_section),
        )
        .route("/admin/regulation/items", post(regulation::create_item))
        .route(
            "/admin/regulation/items/{id}",
            put(regulation::update_item).delete(regulation::delete_item),
        )
        .route("/admin/regulation/upload-pdf", post(uploads::upload_regulation_pdf))
        // Contact singleton.
        .route(
            "/admin/contact",
            get(contact::get_contact).put(contact::update_contact),
        )
        .route("/admin/contact/upload-image", post(uploads::upload_contact_image))
        .route("/admin/courses/upload-image", post(uploads::upload_course_image));

    let router = resource::<News>(router, "/admin/news");
    let router = resource::<Event>(router, "/admin/events");
    let router = resource::<Course>(router, "/admin/courses");
    let router = resource::<Program>(router, "/admin/programs");
    let router = resource::<AdmissionStep>(router, "/admin/admissions");
    let router = resource::<Service>(router, "/admin/services");
    resource::<FaqItem>(router, "/admin/faq")
}
