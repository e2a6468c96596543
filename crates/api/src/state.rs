use std::sync::Arc;

use zipdesk_core::registry::ProjectStore;

use crate::config::ServerConfig;
use crate::locks::ProjectLocks;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Filesystem-backed project registry.
    pub store: Arc<ProjectStore>,
    /// Serializes mutating operations per project.
    pub locks: Arc<ProjectLocks>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = ProjectStore::new(config.data_dir.clone(), config.store_limits());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            locks: Arc::new(ProjectLocks::new()),
        }
    }
}
