use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::RecordId;
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        Audience, CreatedResponse, ItemInput, MessageResponse, RegulationContentInput,
        RegulationView, SectionInput,
    },
    repository::{RegulationRepository, Repositories},
};

async fn view(
    regulation: &dyn RegulationRepository,
    audience: Audience,
) -> ApiResult<RegulationView> {
    let document = regulation.document().await?;
    let sections = regulation.sections(audience).await?;

    Ok(RegulationView {
        content_html: document.content_html,
        pdf_path: document.pdf_path,
        updated_at: document.updated_at,
        sections,
    })
}

/// get_regulation
///
/// [Public Route] The document plus its visible sections, each with its visible items.
#[utoipa::path(
    get,
    path = "/regulation",
    responses((status = 200, description = "Regulation", body = RegulationView))
)]
pub async fn get_regulation(State(repos): State<Repositories>) -> ApiResult<Json<RegulationView>> {
    Ok(Json(view(repos.regulation.as_ref(), Audience::Public).await?))
}

/// [Staff Route] Same shape, hidden sections and items included.
#[utoipa::path(
    get,
    path = "/admin/regulation",
    responses((status = 200, description = "Regulation with hidden rows", body = RegulationView))
)]
pub async fn get_admin_regulation(
    State(repos): State<Repositories>,
) -> ApiResult<Json<RegulationView>> {
    Ok(Json(view(repos.regulation.as_ref(), Audience::Admin).await?))
}

#[utoipa::path(
    put,
    path = "/admin/regulation",
    request_body = RegulationContentInput,
    responses((status = 200, description = "Updated", body = MessageResponse))
)]
pub async fn update_content(
    user: AuthUser,
    State(repos): State<Repositories>,
    payload: Result<Json<RegulationContentInput>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(input) = payload?;
    repos
        .regulation
        .update_content_html(&input.content_html.unwrap_or_default())
        .await?;

    tracing::info!(user_id = user.id, "regulation content updated");
    Ok(Json(MessageResponse::new("Regulation updated")))
}

// --- Sections ---

#[utoipa::path(
    post,
    path = "/admin/regulation/sections",
    request_body = SectionInput,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Missing title")
    )
)]
pub async fn create_section(
    user: AuthUser,
    State(repos): State<Repositories>,
    payload: Result<Json<SectionInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(input) = payload?;
    let draft = input.into_draft()?;

    let id = repos.regulation.create_section(&draft).await?;
    tracing::info!(section_id = id, user_id = user.id, "regulation section created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: "Section created".to_string(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/admin/regulation/sections/{id}",
    request_body = SectionInput,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_section(
    user: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
    payload: Result<Json<SectionInput>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(input) = payload?;
    let draft = input.into_draft()?;

    if !repos.regulation.update_section(id, &draft).await? {
        return Err(ApiError::not_found("Section not found"));
    }
    tracing::info!(section_id = id, user_id = user.id, "regulation section updated");
    Ok(Json(MessageResponse::new("Section updated")))
}

/// delete_section
///
/// [Staff Route] Removes the section together with its items in one transaction.
#[utoipa::path(
    delete,
    path = "/admin/regulation/sections/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_section(
    user: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
) -> ApiResult<Json<MessageResponse>> {
    if !repos.regulation.delete_section(id).await? {
        return Err(ApiError::not_found("Section not found"));
    }
    tracing::info!(section_id = id, user_id = user.id, "regulation section deleted");
    Ok(Json(MessageResponse::new("Section deleted")))
}

// --- Items ---

async fn ensure_section(repos: &Repositories, section_id: i64) -> ApiResult<()> {
    if repos.regulation.section_exists(section_id).await? {
        Ok(())
    } else {
        Err(ApiError::validation("Section does not exist"))
    }
}

#[utoipa::path(
    post,
    path = "/admin/regulation/items",
    request_body = ItemInput,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Missing fields or unknown section")
    )
)]
pub async fn create_item(
    user: AuthUser,
    State(repos): State<Repositories>,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(input) = payload?;
    let draft = input.into_draft()?;
    ensure_section(&repos, draft.section_id).await?;

    let id = repos.regulation.create_item(&draft).await?;
    tracing::info!(
        item_id = id,
        section_id = draft.section_id,
        user_id = user.id,
        "regulation item created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: "Item created".to_string(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/admin/regulation/items/{id}",
    request_body = ItemInput,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_item(
    user: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(input) = payload?;
    let draft = input.into_draft()?;
    ensure_section(&repos, draft.section_id).await?;

    if !repos.regulation.update_item(id, &draft).await? {
        return Err(ApiError::not_found("Item not found"));
    }
    tracing::info!(item_id = id, user_id = user.id, "regulation item updated");
    Ok(Json(MessageResponse::new("Item updated")))
}

#[utoipa::path(
    delete,
    path = "/admin/regulation/items/{id}",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_item(
    user: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
) -> ApiResult<Json<MessageResponse>> {
    if !repos.regulation.delete_item(id).await? {
        return Err(ApiError::not_found("Item not found"));
    }
    tracing::info!(item_id = id, user_id = user.id, "regulation item deleted");
    Ok(Json(MessageResponse::new("Item deleted")))
}
