use std::path::PathBuf;

/// Domain errors raised by the filesystem layer.
///
/// The API crate maps each variant onto an HTTP status; see
/// `zipdesk_api::error::AppError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Path escapes its root: {0}")]
    PathTraversal(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    #[error("Package build failed: {0}")]
    Build(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
