use axum::Json;
use serde_json::{Value, json};

use super::errors::AppError;

pub mod auth;
pub mod tasks;

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// JSON 404 for unmatched API paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("route not found".to_string())
}
