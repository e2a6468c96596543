//! Path resolution for everything that touches a project on disk.
//!
//! Request paths arrive as raw strings. They are never joined onto a root
//! directly; [`resolve_within`] normalizes them, refuses `..` and absolute
//! forms, and checks the deepest existing ancestor against the canonical
//! root so a symlink inside the project cannot lead outside of it.

use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

/// Validate a single name used as a directory or file key (project id,
/// package id).
pub fn validate_segment(kind: &str, segment: &str) -> Result<(), CoreError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(CoreError::PathTraversal(format!(
            "invalid {kind} '{segment}'"
        )));
    }
    Ok(())
}

/// Lexically normalize a `/`-separated relative path.
///
/// Empty and `.` segments are dropped. Absolute paths, `..` segments and
/// segments that are not plain names on this platform are rejected.
pub fn normalize_relative(relative: &str) -> Result<PathBuf, CoreError> {
    if relative.starts_with('/') || relative.starts_with('\\') {
        return Err(traversal(relative));
    }

    let mut normalized = PathBuf::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(traversal(relative)),
            name => {
                if name.contains(['\\', '\0']) {
                    return Err(traversal(relative));
                }
                let mut components = Path::new(name).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => normalized.push(name),
                    _ => return Err(traversal(relative)),
                }
            }
        }
    }
    Ok(normalized)
}

/// Resolve `relative` beneath `root`, failing closed if the result would
/// leave the root.
///
/// The returned path need not exist. Its deepest existing ancestor (the
/// path itself when present) is canonicalized and must lie inside the
/// canonical root.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, CoreError> {
    let normalized = normalize_relative(relative)?;
    let canonical_root = root
        .canonicalize()
        .map_err(|source| CoreError::DirectoryRead {
            path: root.to_path_buf(),
            source,
        })?;

    let candidate = canonical_root.join(&normalized);
    for ancestor in candidate.ancestors() {
        if let Ok(resolved) = ancestor.canonicalize() {
            if !resolved.starts_with(&canonical_root) {
                return Err(traversal(relative));
            }
            break;
        }
    }

    Ok(candidate)
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn traversal(relative: &str) -> CoreError {
    CoreError::PathTraversal(format!("'{relative}' resolves outside the project"))
}
