//! Filesystem core for the zipdesk upload portal.
//!
//! Everything here is synchronous and framework-free: extracting uploaded
//! archives, walking and editing project trees, rebuilding packages, and
//! the registry that ties the on-disk namespaces together. The API crate
//! runs these calls on tokio's blocking pool.

pub mod editor;
pub mod error;
pub mod extract;
pub mod package;
pub mod paths;
pub mod registry;
pub mod tree;
pub mod types;
pub mod walk;
