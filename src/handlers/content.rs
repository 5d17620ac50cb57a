//! Generic CRUD for the content tables (news, events, courses, programs, admission
//! steps, services, FAQ). One set of handlers is instantiated per `Resource`.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::RecordId;
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{CreatedResponse, MessageResponse, Page, PageQuery},
    repository::{ADMIN_LIMIT, Repositories, Resource},
};

fn not_found<R: Resource>() -> ApiError {
    ApiError::not_found(format!("{} not found", R::LABEL))
}

/// list_public
///
/// [Public Route] Visible rows only, ordered by `(order, id)`. Filterable resources
/// also honor `?category=` and echo it back.
pub async fn list_public<R: Resource>(
    State(repos): State<Repositories>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<R>>> {
    let query = params.resolve(R::PUBLIC_LIMIT);
    let items = R::repository(&repos).list_public(&query).await?;

    Ok(Json(Page {
        page: query.page,
        limit: query.limit,
        category: R::CATEGORY_COLUMN.map(|_| query.category.clone()),
        items,
    }))
}

/// show_public
///
/// [Public Route] A hidden row is indistinguishable from a missing one.
pub async fn show_public<R: Resource>(
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
) -> ApiResult<Json<R>> {
    R::repository(&repos)
        .get_public(id)
        .await?
        .map(Json)
        .ok_or_else(not_found::<R>)
}

/// list_admin
///
/// [Staff Route] Every row, hidden ones included.
pub async fn list_admin<R: Resource>(
    State(repos): State<Repositories>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<R>>> {
    let query = params.resolve(ADMIN_LIMIT);
    let items = R::repository(&repos).list_admin(&query).await?;

    Ok(Json(Page {
        page: query.page,
        limit: query.limit,
        category: None,
        items,
    }))
}

pub async fn show_admin<R: Resource>(
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
) -> ApiResult<Json<R>> {
    R::repository(&repos)
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(not_found::<R>)
}

/// create
///
/// [Staff Route] Validates the payload and inserts it. Tables that track authorship
/// record the caller as `created_by`.
pub async fn create<R: Resource>(
    user: AuthUser,
    State(repos): State<Repositories>,
    payload: Result<Json<R::Input>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(input) = payload?;
    let fields = R::fields(input)?;
    let author = R::TRACKS_AUTHOR.then_some(user.id);

    let id = R::repository(&repos).create(fields, author).await?;
    tracing::info!(table = R::TABLE, id, user_id = user.id, "record created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: format!("{} created", R::LABEL),
        }),
    ))
}

/// update
///
/// [Staff Route] Full replacement: omitted optional fields are cleared and
/// `visible`/`order` fall back to their defaults.
pub async fn update<R: Resource>(
    user: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
    payload: Result<Json<R::Input>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(input) = payload?;
    let fields = R::fields(input)?;

    if !R::repository(&repos).update(id, fields).await? {
        return Err(not_found::<R>());
    }
    tracing::info!(table = R::TABLE, id, user_id = user.id, "record updated");

    Ok(Json(MessageResponse::new(format!("{} updated", R::LABEL))))
}

pub async fn delete<R: Resource>(
    user: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
) -> ApiResult<Json<MessageResponse>> {
    if !R::repository(&repos).delete(id).await? {
        return Err(not_found::<R>());
    }
    tracing::info!(table = R::TABLE, id, user_id = user.id, "record deleted");

    Ok(Json(MessageResponse::new(format!("{} deleted", R::LABEL))))
}
