//! Handlers for `/projects/{id}/files/{*path}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::run_blocking;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentResponse {
    pub success: bool,
    pub content: String,
    pub file_path: String,
}

/// Body of a file write. `content` is optional here so a missing field
/// yields a descriptive 400 instead of a generic rejection.
#[derive(Debug, Deserialize)]
pub struct WriteFileRequest {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWrittenResponse {
    pub success: bool,
    pub message: &'static str,
    pub file_path: String,
}

/// GET /api/projects/{id}/files/{*path}
pub async fn read(
    State(state): State<AppState>,
    Path((id, file_path)): Path<(String, String)>,
) -> AppResult<Json<FileContentResponse>> {
    let store = Arc::clone(&state.store);
    let relative = file_path.clone();
    let content = run_blocking(move || store.read_file(&id, &relative)).await?;

    Ok(Json(FileContentResponse {
        success: true,
        content,
        file_path,
    }))
}

/// PUT /api/projects/{id}/files/{*path}
pub async fn write(
    State(state): State<AppState>,
    Path((id, file_path)): Path<(String, String)>,
    Json(input): Json<WriteFileRequest>,
) -> AppResult<Json<FileWrittenResponse>> {
    let content = input
        .content
        .ok_or_else(|| AppError::BadRequest("Content is required".into()))?;

    let _guard = state.locks.acquire(&id).await;

    let store = Arc::clone(&state.store);
    let relative = file_path.clone();
    run_blocking(move || store.write_file(&id, &relative, &content)).await?;

    Ok(Json(FileWrittenResponse {
        success: true,
        message: "File updated successfully",
        file_path,
    }))
}
