use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/links", get(handler::list_public_links))
        .route("/admin/link-groups", get(handler::list_groups))
        .route("/admin/link-groups", post(handler::create_group))
        .route("/admin/link-groups/:id", put(handler::update_group))
        .route("/admin/link-groups/:id", delete(handler::delete_group))
        .route("/admin/link-groups/:id/links", get(handler::list_group_links))
        .route("/admin/links", post(handler::create_link))
        .route("/admin/links/:id", put(handler::update_link))
        .route("/admin/links/:id", delete(handler::delete_link))
}
