use axum::routing::get;
use axum::Router;

use crate::handlers::upload;
use crate::state::AppState;

/// Upload routes, mounted under `/api`.
///
/// ```text
/// GET    /upload     upload constraints
/// POST   /upload     upload and extract a .zip (multipart field "file")
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/upload", get(upload::constraints).post(upload::upload))
}
