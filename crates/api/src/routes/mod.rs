pub mod health;
pub mod projects;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /upload                                           constraints (GET), upload (POST)
///
/// /projects                                         list
/// /projects/{id}                                    tree, delete
/// /projects/{id}/files/{*path}                      read (GET), write (PUT)
/// /projects/{id}/package                            info (GET), build (POST)
/// /projects/{id}/package/download/{package_id}      download (GET), delete (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(upload::router())
        .merge(projects::router())
}
