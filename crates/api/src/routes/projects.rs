use axum::routing::get;
use axum::Router;

use crate::handlers::{files, packages, projects};
use crate::state::AppState;

/// Project routes, mounted under `/api`.
///
/// ```text
/// GET    /projects                                        list projects
/// GET    /projects/{id}                                   project tree
/// DELETE /projects/{id}                                   delete project
/// GET    /projects/{id}/files/{*path}                     read file
/// PUT    /projects/{id}/files/{*path}                     write file
/// GET    /projects/{id}/package                           package info
/// POST   /projects/{id}/package                           build package
/// GET    /projects/{id}/package/download/{package_id}     download package
/// DELETE /projects/{id}/package/download/{package_id}     delete package
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(projects::list))
        .route(
            "/projects/{id}",
            get(projects::get_tree).delete(projects::delete),
        )
        .route(
            "/projects/{id}/files/{*path}",
            get(files::read).put(files::write),
        )
        .route(
            "/projects/{id}/package",
            get(packages::info).post(packages::build),
        )
        .route(
            "/projects/{id}/package/download/{package_id}",
            get(packages::download).delete(packages::delete),
        )
}
