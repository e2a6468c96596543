pub mod files;
pub mod packages;
pub mod projects;
pub mod upload;

use zipdesk_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Run synchronous filesystem work on tokio's blocking pool.
///
/// A panicking or cancelled task surfaces as a 500.
pub async fn run_blocking<F, T>(task: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking task failed: {e}")))?
        .map_err(AppError::from)
}
