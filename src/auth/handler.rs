use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::{Credentials, Identity};
use crate::api::MessageResponse;
use crate::error::{AppError, AppResult, AuthError};
use crate::handler::{AppState, JsonBody};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Invalid request body"));
    }

    let conn = state.db.connect().await?;
    let creds = Credentials::new(&conn, &state.passwords);

    let Some(user) = creds.authenticate(&req.username, &req.password).await? else {
        tracing::info!("rejected login attempt");
        return Err(AuthError::InvalidCredentials.into());
    };

    let token = state.tokens.issue(user.id, &user.username)?;
    tracing::info!(user_id = user.id, username = %user.username, "login succeeded");

    Ok(Json(LoginResponse {
        token,
        username: user.username,
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(AppError::validation("Invalid request body"));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("New password must be at least 6 characters"));
    }

    let conn = state.db.connect().await?;
    let creds = Credentials::new(&conn, &state.passwords);

    let user = creds
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    if !state.passwords.verify(&req.old_password, &user.password_hash).await? {
        tracing::info!(user_id = identity.user_id, "password change rejected, old password mismatch");
        return Err(AuthError::InvalidOldPassword.into());
    }

    if !creds.update_password(identity.user_id, &req.new_password).await? {
        return Err(AppError::NotFound("User not found"));
    }

    tracing::info!(user_id = identity.user_id, "password updated");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
