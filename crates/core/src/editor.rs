//! Reading and writing single text files inside a project.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::CoreError;
use crate::paths::resolve_within;

/// Read a project file as UTF-8 text.
///
/// Invalid UTF-8 is rejected rather than replaced, so the editor never
/// silently corrupts a binary file on the next save.
pub fn read_text(root: &Path, relative: &str) -> Result<String, CoreError> {
    let path = resolve_within(root, relative)?;

    let metadata = match fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CoreError::not_found("File", relative));
        }
        Err(e) => return Err(CoreError::FileRead(format!("'{relative}': {e}"))),
    };
    if metadata.is_dir() {
        return Err(CoreError::FileRead(format!("'{relative}' is a directory")));
    }

    let bytes = fs::read(&path).map_err(|e| CoreError::FileRead(format!("'{relative}': {e}")))?;
    String::from_utf8(bytes).map_err(|e| {
        CoreError::FileRead(format!(
            "'{relative}' is not valid UTF-8 text (invalid byte at offset {})",
            e.utf8_error().valid_up_to()
        ))
    })
}

/// Replace the content of a project file.
///
/// The new content is written to a temporary file in the same directory
/// and renamed over the target, so readers see either the old or the new
/// content. The file is created if missing; its directory must exist.
pub fn write_text(root: &Path, relative: &str, content: &str) -> Result<(), CoreError> {
    let path = resolve_within(root, relative)?;

    if path.is_dir() {
        return Err(CoreError::FileWrite(format!("'{relative}' is a directory")));
    }
    let parent = path
        .parent()
        .ok_or_else(|| CoreError::FileWrite(format!("'{relative}' has no parent directory")))?;
    if !parent.is_dir() {
        return Err(CoreError::not_found("Directory", relative));
    }

    let write_error = |e: io::Error| CoreError::FileWrite(format!("'{relative}': {e}"));

    let mut staged = tempfile::Builder::new()
        .prefix(".zipdesk-")
        .tempfile_in(parent)
        .map_err(write_error)?;
    staged.write_all(content.as_bytes()).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;

    if let Ok(existing) = fs::metadata(&path) {
        // Keep the original mode; the temp file is created 0600.
        fs::set_permissions(staged.path(), existing.permissions()).map_err(write_error)?;
    }

    staged.persist(&path).map_err(|e| write_error(e.error))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "File content replaced");
    Ok(())
}
