//! Handlers for `/projects` and `/projects/{id}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use zipdesk_core::registry::ProjectSummary;
use zipdesk_core::tree::FileNode;

use crate::error::AppResult;
use crate::handlers::run_blocking;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub success: bool,
    pub files: Vec<ProjectSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTreeResponse {
    pub success: bool,
    pub project_id: String,
    pub contents: Vec<FileNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDeletedResponse {
    pub success: bool,
    pub message: &'static str,
    pub project_id: String,
}

/// GET /api/projects
pub async fn list(State(state): State<AppState>) -> AppResult<Json<ProjectListResponse>> {
    let store = Arc::clone(&state.store);
    let files = run_blocking(move || store.list()).await?;

    Ok(Json(ProjectListResponse {
        success: true,
        count: files.len(),
        files,
    }))
}

/// GET /api/projects/{id}
pub async fn get_tree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProjectTreeResponse>> {
    let store = Arc::clone(&state.store);
    let project_id = id.clone();
    let contents = run_blocking(move || store.tree(&project_id)).await?;

    Ok(Json(ProjectTreeResponse {
        success: true,
        project_id: id,
        contents,
    }))
}

/// DELETE /api/projects/{id}
///
/// Removes the extracted tree together with the stored upload. Built
/// packages stay downloadable.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProjectDeletedResponse>> {
    let _guard = state.locks.acquire(&id).await;

    let store = Arc::clone(&state.store);
    let project_id = id.clone();
    run_blocking(move || store.delete(&project_id)).await?;

    Ok(Json(ProjectDeletedResponse {
        success: true,
        message: "Project deleted successfully",
        project_id: id,
    }))
}
