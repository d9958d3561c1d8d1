use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;

use super::{ExportDocument, ImportSummary, Transfer};
use crate::auth::Identity;
use crate::error::{AppError, AppResult};
use crate::handler::AppState;

const EXPORT_FILENAME: &str = "link-deck-export.json";

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub summary: ImportSummary,
}

pub async fn export(State(state): State<AppState>, identity: Identity) -> AppResult<impl IntoResponse> {
    let conn = state.db.connect().await?;
    let doc = Transfer::new(&conn).export().await?;

    tracing::info!(
        user = %identity.username,
        groups = doc.link_groups.len(),
        "exported link catalog"
    );

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={EXPORT_FILENAME}"),
        )],
        Json(doc),
    ))
}

pub async fn import(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ImportResponse>> {
    let mut multipart = multipart?;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            file = Some(field.bytes().await?);
            break;
        }
    }

    let Some(bytes) = file else {
        return Err(AppError::validation("No file provided"));
    };

    let doc: ExportDocument = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "import file is not a valid export document");
        AppError::validation("Invalid JSON format")
    })?;
    doc.validate().map_err(AppError::Validation)?;

    // Dedicated connection, the transaction must not interleave with other requests.
    let conn = state.db.connect().await?;
    let summary = Transfer::new(&conn).import(&doc).await?;

    tracing::info!(
        user = %identity.username,
        created = summary.groups_created,
        replaced = summary.groups_replaced,
        links = summary.links_imported,
        "imported link catalog"
    );

    Ok(Json(ImportResponse {
        message: "Data imported successfully".to_string(),
        summary,
    }))
}
