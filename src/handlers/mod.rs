//! HTTP handlers, grouped by area. Every handler returns `ApiResult`, so failures
//! render as `{"error": "..."}` through `ApiError`.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::error::ApiError;

pub mod auth;
pub mod contact;
pub mod content;
pub mod regulation;
pub mod system;
pub mod uploads;
pub mod users;

/// RecordId
///
/// The `{id}` path segment. Anything that is not an integer is reported as a
/// missing record rather than axum's plain-text rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(RecordId(id))
    }
}
