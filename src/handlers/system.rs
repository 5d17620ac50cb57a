use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::{error::ApiError, repository::Repositories};

/// Liveness for load balancers. Does not touch the database.
pub async fn health() -> &'static str {
    "ok"
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// db_test
///
/// Round-trips `SELECT 1`. Failures are reported in the body rather than through
/// `ApiError`, so the driver message is visible to whoever runs the check.
pub async fn db_test(State(repos): State<Repositories>) -> (StatusCode, Json<Value>) {
    match repos.health.ping().await {
        Ok(row) => (StatusCode::OK, Json(json!({ "db": "ok", "row": row }))),
        Err(e) => {
            tracing::error!(error = %e, "database check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "db": "error", "message": e.to_string() })),
            )
        }
    }
}

/// Fallback for every unmatched route.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
