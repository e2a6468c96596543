//! Handlers for `/upload`.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use zipdesk_core::error::CoreError;
use zipdesk_core::extract::ARCHIVE_EXTENSION;
use zipdesk_core::registry::UploadOutcome;

use crate::error::{AppError, AppResult};
use crate::handlers::run_blocking;
use crate::state::AppState;

/// Multipart field carrying the archive.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConstraints {
    pub message: &'static str,
    pub max_file_size: u64,
    pub allowed_types: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

/// GET /api/upload
pub async fn constraints(State(state): State<AppState>) -> Json<UploadConstraints> {
    Json(UploadConstraints {
        message: "Upload endpoint is ready",
        max_file_size: state.config.max_upload_bytes,
        allowed_types: vec![ARCHIVE_EXTENSION],
    })
}

/// POST /api/upload
///
/// Accepts a multipart form with a `file` field, validates it as a `.zip`
/// within the size limit, and extracts it into a new project.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut file_data: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue; // ignore unknown fields
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        file_data = Some((file_name, data));
    }

    let (file_name, data) =
        file_data.ok_or_else(|| CoreError::Validation("No file provided".into()))?;

    tracing::debug!(file_name = %file_name, size = data.len(), "Received upload");

    let store = Arc::clone(&state.store);
    let outcome = run_blocking(move || store.ingest(&file_name, &data)).await?;

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded and extracted successfully",
        outcome,
    }))
}
