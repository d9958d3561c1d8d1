use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    response::IntoResponse,
};

use tracing::info;

use crate::api::HealthResponse;
use crate::auth::{PasswordHasher, TokenService};
use crate::db::Database;
use crate::error::AppError;

/// Deployment switches for the two listing routes.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    pub public_links: bool,
    pub empty_list_on_missing_auth: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
    pub access: AccessPolicy,
}

/// `axum::Json` whose rejection is our 400 body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Path` whose rejection is our 400 body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
