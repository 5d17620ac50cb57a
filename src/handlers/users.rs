//! Staff account management. Every route here sits behind the superadmin gate.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::RecordId;
use crate::{
    auth::{AuthUser, Role, hash_password},
    error::{ApiError, ApiResult},
    models::{
        AccountChanges, CreateStaffRequest, CreatedResponse, MessageResponse, NewUser,
        ResetPasswordRequest, StaffActionResponse, StaffList, StaffMember, UpdateStaffRequest,
        looks_like_email, normalize_email,
    },
    repository::Repositories,
};

/// The first superadmin. It can never be demoted, deactivated or deleted, and only
/// its owner may reset its password.
pub const PRINCIPAL_SUPERADMIN_ID: i64 = 1;

/// Parses a requested staff role. Only `admin` and `superadmin` can be assigned here.
fn staff_role(raw: &str) -> Option<Role> {
    Role::parse(raw.trim()).filter(Role::is_staff)
}

async fn find_staff(repos: &Repositories, id: i64) -> ApiResult<StaffMember> {
    repos
        .users
        .find_staff(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Staff accounts", body = StaffList))
)]
pub async fn list_staff(State(repos): State<Repositories>) -> ApiResult<Json<StaffList>> {
    let items = repos.users.list_staff().await?;
    Ok(Json(StaffList { items }))
}

/// create_staff
///
/// [Superadmin Route] Adds an admin or superadmin. An unknown or missing role falls
/// back to `admin`.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Missing fields or invalid email"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_staff(
    caller: AuthUser,
    State(repos): State<Repositories>,
    payload: Result<Json<CreateStaffRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(request) = payload?;

    let name = request.name.trim().to_string();
    let email = normalize_email(&request.email);
    if name.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("Name, email and password are required"));
    }
    if !looks_like_email(&email) {
        return Err(ApiError::validation("Invalid email"));
    }
    if repos.users.email_exists(&email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let role = request
        .role
        .as_deref()
        .and_then(staff_role)
        .unwrap_or(Role::Admin);
    let password_hash = hash_password(&request.password).await?;

    let id = repos
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?;
    tracing::info!(user_id = id, %role, by = caller.id, "staff account created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            message: "User created".to_string(),
        }),
    ))
}

/// update_staff
///
/// [Superadmin Route] Toggles `is_active` and `verified` or changes the role.
/// Omitted fields are left as they are.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    request_body = UpdateStaffRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 400, description = "Invalid role or protected account"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_staff(
    caller: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
    payload: Result<Json<UpdateStaffRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;

    let role = match request.role.as_deref() {
        Some(raw) => Some(staff_role(raw).ok_or_else(|| ApiError::validation("Invalid role"))?),
        None => None,
    };
    let changes = AccountChanges {
        is_active: request.is_active,
        role,
        verified: request.verified,
    };

    if id == PRINCIPAL_SUPERADMIN_ID
        && (changes.is_active == Some(false)
            || changes.role.is_some_and(|r| r != Role::Superadmin))
    {
        return Err(ApiError::validation(
            "The principal superadmin cannot be deactivated or demoted",
        ));
    }
    if changes.is_empty() {
        return Ok(Json(MessageResponse::new("Nothing to update")));
    }

    find_staff(&repos, id).await?;
    if !repos.users.update_account(id, &changes).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = id, by = caller.id, ?changes, "staff account updated");

    Ok(Json(MessageResponse::new("User updated")))
}

/// reset_password
///
/// [Superadmin Route] Sets a new password for a staff account. The password is not
/// echoed back.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = StaffActionResponse),
        (status = 400, description = "Missing password or protected account"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn reset_password(
    caller: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<StaffActionResponse>> {
    let Json(request) = payload?;
    if request.new_password.trim().is_empty() {
        return Err(ApiError::validation("new_password is required"));
    }

    let target = find_staff(&repos, id).await?;
    if target.id == PRINCIPAL_SUPERADMIN_ID && caller.id != PRINCIPAL_SUPERADMIN_ID {
        return Err(ApiError::validation(
            "Only the principal superadmin can reset this password",
        ));
    }

    let hash = hash_password(&request.new_password).await?;
    if !repos.users.set_password_hash(target.id, &hash).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = target.id, by = caller.id, "staff password reset");

    Ok(Json(StaffActionResponse {
        message: "Password reset".to_string(),
        user_id: target.id,
        user_email: target.email,
    }))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    responses(
        (status = 200, description = "Deleted", body = StaffActionResponse),
        (status = 400, description = "Protected account or self"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_staff(
    caller: AuthUser,
    State(repos): State<Repositories>,
    RecordId(id): RecordId,
) -> ApiResult<Json<StaffActionResponse>> {
    if id == PRINCIPAL_SUPERADMIN_ID {
        return Err(ApiError::validation(
            "The principal superadmin cannot be deleted",
        ));
    }
    if id == caller.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    let target = find_staff(&repos, id).await?;
    if !repos.users.delete(target.id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = target.id, by = caller.id, "staff account deleted");

    Ok(Json(StaffActionResponse {
        message: "User deleted".to_string(),
        user_id: target.id,
        user_email: target.email,
    }))
}
