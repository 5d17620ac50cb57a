use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    auth::AuthUser,
    error::ApiResult,
    models::{ContactSettings, ContactUpdate, MessageResponse},
    repository::Repositories,
};

/// get_contact
///
/// [Public Route] The contact singleton. Served at `/contact` and `/admin/contact`.
#[utoipa::path(
    get,
    path = "/contact",
    responses((status = 200, description = "Contact settings", body = ContactSettings))
)]
pub async fn get_contact(State(repos): State<Repositories>) -> ApiResult<Json<ContactSettings>> {
    Ok(Json(repos.contact.settings().await?))
}

/// update_contact
///
/// [Staff Route] Replaces phones, emails, address, schedule and socials. Blank list
/// entries and incomplete social links are dropped. `hero_image` is left alone.
#[utoipa::path(
    put,
    path = "/admin/contact",
    request_body = ContactUpdate,
    responses((status = 200, description = "Updated", body = MessageResponse))
)]
pub async fn update_contact(
    user: AuthUser,
    State(repos): State<Repositories>,
    payload: Result<Json<ContactUpdate>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(update) = payload?;
    repos.contact.update(&update.normalize()).await?;

    tracing::info!(user_id = user.id, "contact settings updated");
    Ok(Json(MessageResponse::new("Contact settings updated")))
}
