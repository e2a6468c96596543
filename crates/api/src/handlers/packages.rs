//! Handlers for `/projects/{id}/package`.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use zipdesk_core::package::{PackageDescriptor, PackageInfo};

use crate::error::{AppError, AppResult};
use crate::handlers::run_blocking;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PackageInfoResponse {
    pub success: bool,
    pub package: PackageInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageBuiltResponse {
    pub success: bool,
    pub package: PackageDescriptor,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDeletedResponse {
    pub success: bool,
    pub message: &'static str,
    pub package_id: String,
}

/// GET /api/projects/{id}/package
pub async fn info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PackageInfoResponse>> {
    let store = Arc::clone(&state.store);
    let package = run_blocking(move || store.package_info(&id)).await?;

    Ok(Json(PackageInfoResponse {
        success: true,
        package,
    }))
}

/// POST /api/projects/{id}/package
///
/// Builds a fresh package from the project's current files.
pub async fn build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PackageBuiltResponse>> {
    let _guard = state.locks.acquire(&id).await;

    let store = Arc::clone(&state.store);
    let project_id = id.clone();
    let package = run_blocking(move || store.build_package(&project_id)).await?;

    let download_url = format!("/api/projects/{id}/package/download/{}", package.id);
    Ok(Json(PackageBuiltResponse {
        success: true,
        package,
        download_url,
    }))
}

/// GET /api/projects/{id}/package/download/{package_id}
///
/// Streams the package archive as an attachment.
pub async fn download(
    State(state): State<AppState>,
    Path((id, package_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let store = Arc::clone(&state.store);
    let path = run_blocking(move || store.locate_package(&id, &package_id)).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to open {}: {e}", path.display())))?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    tracing::debug!(path = %path.display(), file_size, "Streaming package");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(format!("Failed to build download response: {e}")))
}

/// DELETE /api/projects/{id}/package/download/{package_id}
pub async fn delete(
    State(state): State<AppState>,
    Path((id, package_id)): Path<(String, String)>,
) -> AppResult<Json<PackageDeletedResponse>> {
    let _guard = state.locks.acquire(&id).await;

    let store = Arc::clone(&state.store);
    let target = package_id.clone();
    run_blocking(move || store.delete_package(&id, &target)).await?;

    Ok(Json(PackageDeletedResponse {
        success: true,
        message: "Package deleted successfully",
        package_id,
    }))
}
