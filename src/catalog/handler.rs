//! HTTP Handlers for groups and links

use axum::{Json, extract::State, http::StatusCode};

use super::Catalog;
use crate::api::{CreatedResponse, MessageResponse};
use crate::auth::{Identity, RequestContext};
use crate::error::{AppError, AppResult};
use crate::handler::{ApiPath, AppState, JsonBody};
use crate::model::{Link, LinkGroup, LinkGroupInput, LinkInput};

async fn all_groups(state: &AppState) -> AppResult<Json<Vec<LinkGroup>>> {
    let conn = state.db.connect().await?;
    let groups = Catalog::new(&conn).list_groups().await?;
    tracing::debug!("listed {} link groups", groups.len());
    Ok(Json(groups))
}

// ============================================================================
// Listing
// ============================================================================

pub async fn list_public_links(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<Vec<LinkGroup>>> {
    if !state.access.public_links {
        ctx.into_identity()?;
    }
    all_groups(&state).await
}

pub async fn list_groups(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<Vec<LinkGroup>>> {
    if ctx.is_missing_credentials() && state.access.empty_list_on_missing_auth {
        tracing::info!("no credentials on link-groups listing, answering with an empty list");
        return Ok(Json(Vec::new()));
    }
    ctx.into_identity()?;
    all_groups(&state).await
}

pub async fn list_group_links(
    State(state): State<AppState>,
    _identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Vec<Link>>> {
    let conn = state.db.connect().await?;

    match Catalog::new(&conn).list_links(id).await? {
        Some(links) => Ok(Json(links)),
        None => Err(AppError::NotFound("Group not found")),
    }
}

// ============================================================================
// Groups
// ============================================================================

pub async fn create_group(
    State(state): State<AppState>,
    _identity: Identity,
    JsonBody(input): JsonBody<LinkGroupInput>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    input.validate()?;
    let conn = state.db.connect().await?;

    let id = Catalog::new(&conn).create_group(&input).await?;
    tracing::info!(group_id = id, name = %input.name, "created link group");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse::new(id, "Link group created successfully")),
    ))
}

pub async fn update_group(
    State(state): State<AppState>,
    _identity: Identity,
    ApiPath(id): ApiPath<i64>,
    JsonBody(input): JsonBody<LinkGroupInput>,
) -> AppResult<Json<MessageResponse>> {
    input.validate()?;
    let conn = state.db.connect().await?;

    if !Catalog::new(&conn).update_group(id, &input).await? {
        return Err(AppError::NotFound("Group not found"));
    }

    Ok(Json(MessageResponse::new("Link group updated successfully")))
}

pub async fn delete_group(
    State(state): State<AppState>,
    _identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    let conn = state.db.connect().await?;

    if !Catalog::new(&conn).delete_group(id).await? {
        return Err(AppError::NotFound("Group not found"));
    }

    tracing::info!(group_id = id, "deleted link group");
    Ok(Json(MessageResponse::new("Link group deleted successfully")))
}

// ============================================================================
// Links
// ============================================================================

pub async fn create_link(
    State(state): State<AppState>,
    _identity: Identity,
    JsonBody(input): JsonBody<LinkInput>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    input.validate()?;
    let conn = state.db.connect().await?;

    let Some(id) = Catalog::new(&conn).create_link(&input).await? else {
        return Err(AppError::NotFound("Group not found"));
    };

    tracing::info!(link_id = id, group_id = input.group_id, "created link");
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id, "Link created successfully"))))
}

pub async fn update_link(
    State(state): State<AppState>,
    _identity: Identity,
    ApiPath(id): ApiPath<i64>,
    JsonBody(input): JsonBody<LinkInput>,
) -> AppResult<Json<MessageResponse>> {
    input.validate()?;
    let conn = state.db.connect().await?;
    let catalog = Catalog::new(&conn);

    if !catalog.group_exists(input.group_id).await? {
        return Err(AppError::NotFound("Group not found"));
    }
    if !catalog.update_link(id, &input).await? {
        return Err(AppError::NotFound("Link not found"));
    }

    Ok(Json(MessageResponse::new("Link updated successfully")))
}

pub async fn delete_link(
    State(state): State<AppState>,
    _identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MessageResponse>> {
    let conn = state.db.connect().await?;

    if !Catalog::new(&conn).delete_link(id).await? {
        return Err(AppError::NotFound("Link not found"));
    }

    Ok(Json(MessageResponse::new("Link deleted successfully")))
}
