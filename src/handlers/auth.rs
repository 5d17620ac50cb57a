use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{AuthUser, TokenSubject, attempt_login},
    error::{ApiError, ApiResult},
    models::{LoginRequest, LoginResponse},
};

/// Identity echo for the admin panel's session check.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub message: String,
    pub user: AuthUser,
}

/// login
///
/// [Public Route] Exchanges email and password for a session token. Every failure
/// is the same 401 so the response never reveals which part was wrong.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;

    let Some(user) = attempt_login(state.repos.users.as_ref(), &request.email, &request.password)
        .await?
    else {
        tracing::info!("login rejected");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    let token = state
        .tokens
        .issue(&TokenSubject::from(&user))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, role = %user.role, "login succeeded");
    Ok(Json(LoginResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/admin/whoami",
    responses((status = 200, description = "Current session", body = SessionInfo))
)]
pub async fn whoami(user: AuthUser) -> Json<SessionInfo> {
    Json(SessionInfo {
        message: "Authenticated".to_string(),
        user,
    })
}
