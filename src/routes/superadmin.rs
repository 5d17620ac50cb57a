use crate::{AppState, handlers::users};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Superadmin Router Module
///
/// Staff account management. Wrapped by the superadmin gate in `create_router`.
pub fn superadmin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(users::list_staff).post(users::create_staff))
        .route(
            "/admin/users/{id}",
            put(users::update_staff).delete(users::delete_staff),
        )
        .route("/admin/users/{id}/reset-password", post(users::reset_password))
}
