use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

/// Upper bound on an import request body.
pub const MAX_IMPORT_BYTES: usize = 10 << 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/export", get(handler::export))
        .route(
            "/admin/import",
            post(handler::import).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
}
