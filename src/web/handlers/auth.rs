use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, verify_unknown_account};
use crate::models::{User, validate_email, validate_name, validate_password};
use crate::web::AppState;
use crate::web::errors::AppError;
use crate::web::extract::{ApiJson, AuthUser};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

const BAD_CREDENTIALS: &str = "invalid email or password";

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = validate_name(&req.name).map_err(AppError::Validation)?;
    let email = validate_email(&req.email).map_err(AppError::Validation)?;
    validate_password(&req.password).map_err(AppError::Validation)?;

    let taken = state.db()?.find_user_by_email(&email)?.is_some();
    if taken {
        return Err(AppError::Conflict("user already exists".to_string()));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))??;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        created_at: Utc::now(),
    };

    let inserted = state.db()?.insert_user(&user)?;
    if !inserted {
        return Err(AppError::Conflict("user already exists".to_string()));
    }
    info!(user_id = %user.id, "registered user");

    let response = issue_for(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let user = state.db()?.find_user_by_email(&email)?;
    let password = req.password;
    let Some(user) = user else {
        // Unknown accounts cost one Argon2 verification, like a wrong password.
        tokio::task::spawn_blocking(move || verify_unknown_account(&password))
            .await
            .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?;
        warn!("login attempt for unknown account");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    let stored = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))??;
    if !matches {
        warn!(user_id = %user.id, "login failed: wrong password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_for(&state, user)?))
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

fn issue_for(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let now = Utc::now();
    let token = state.tokens.issue_at(&user.id, now)?;
    let expires_at = now
        .checked_add_signed(state.tokens.ttl())
        .ok_or_else(|| AppError::Internal("token expiry is out of range".to_string()))?;
    Ok(AuthResponse {
        token,
        expires_at,
        user,
    })
}
