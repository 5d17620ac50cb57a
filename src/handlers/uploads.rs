//! Multipart upload endpoints. Files land in the upload directory under a random
//! name and are served back from `/uploads`.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    repository::Repositories,
    storage::{StorageState, UploadKind},
};

#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseImageUploaded {
    pub url: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContactImageUploaded {
    pub image_url: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegulationPdfUploaded {
    pub pdf_path: String,
    pub message: String,
}

/// receive
///
/// Pulls the file out of `kind`'s field, validates it and hands it to storage.
/// Other fields are skipped.
async fn receive(
    storage: &StorageState,
    kind: UploadKind,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.field_name()) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes: Bytes = field.bytes().await?;
        let extension = kind.validate(&filename, bytes.len())?;

        return Ok(storage.store(kind, &extension, &bytes).await?);
    }

    Err(ApiError::validation(format!(
        "No file uploaded in field '{}'",
        kind.field_name()
    )))
}

/// Best-effort cleanup of a stored file whose database update failed.
async fn discard(storage: &StorageState, url: &str) {
    if let Err(e) = storage.remove(url).await {
        tracing::warn!(error = %e, %url, "orphaned upload could not be removed");
    }
}

/// upload_course_image
///
/// [Staff Route] Stores a course image and returns its URL. The course itself is not
/// touched: the client saves the URL through the regular course update.
#[utoipa::path(
    post,
    path = "/admin/courses/upload-image",
    responses(
        (status = 200, description = "Stored", body = CourseImageUploaded),
        (status = 400, description = "Missing, wrong type or too large")
    )
)]
pub async fn upload_course_image(
    user: AuthUser,
    State(storage): State<StorageState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<CourseImageUploaded>> {
    let url = receive(&storage, UploadKind::CourseImage, multipart).await?;
    tracing::info!(user_id = user.id, %url, "course image uploaded");

    Ok(Json(CourseImageUploaded {
        url,
        message: "Image uploaded".to_string(),
    }))
}

/// upload_contact_image
///
/// [Staff Route] Stores the contact page hero image and records it on the singleton.
#[utoipa::path(
    post,
    path = "/admin/contact/upload-image",
    responses(
        (status = 200, description = "Stored", body = ContactImageUploaded),
        (status = 400, description = "Missing, wrong type or too large")
    )
)]
pub async fn upload_contact_image(
    user: AuthUser,
    State(storage): State<StorageState>,
    State(repos): State<Repositories>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ContactImageUploaded>> {
    let image_url = receive(&storage, UploadKind::ContactImage, multipart).await?;
    if let Err(e) = repos.contact.update_hero_image(&image_url).await {
        discard(&storage, &image_url).await;
        return Err(e.into());
    }
    tracing::info!(user_id = user.id, url = %image_url, "contact image uploaded");

    Ok(Json(ContactImageUploaded {
        image_url,
        message: "Image uploaded".to_string(),
    }))
}

/// upload_regulation_pdf
///
/// [Staff Route] Stores the regulation PDF and points the document at it.
#[utoipa::path(
    post,
    path = "/admin/regulation/upload-pdf",
    responses(
        (status = 200, description = "Stored", body = RegulationPdfUploaded),
        (status = 400, description = "Missing, not a PDF or too large")
    )
)]
pub async fn upload_regulation_pdf(
    user: AuthUser,
    State(storage): State<StorageState>,
    State(repos): State<Repositories>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<RegulationPdfUploaded>> {
    let pdf_path = receive(&storage, UploadKind::RegulationPdf, multipart).await?;
    if let Err(e) = repos.regulation.update_pdf_path(&pdf_path).await {
        discard(&storage, &pdf_path).await;
        return Err(e.into());
    }
    tracing::info!(user_id = user.id, path = %pdf_path, "regulation pdf uploaded");

    Ok(Json(RegulationPdfUploaded {
        pdf_path,
        message: "PDF uploaded".to_string(),
    }))
}
