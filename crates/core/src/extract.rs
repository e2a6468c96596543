//! Upload validation and archive extraction.
//!
//! Extraction never writes into the final project directory directly: the
//! archive is unpacked into a hidden staging directory next to it and
//! renamed into place only once every entry has been written. A failure at
//! any point drops the staging directory, so no half-extracted project is
//! ever visible.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use serde::Serialize;

use crate::error::CoreError;
use crate::walk;

/// Accepted upload extension (compared case-insensitively).
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Default upload size limit (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Default maximum number of entries in one archive.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Default maximum uncompressed bytes written for one archive (1 GiB).
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 1024 * 1024 * 1024;

/// Prefix of the hidden staging directories created next to projects.
pub const STAGING_PREFIX: &str = ".staging-";

/// Guards against archives that expand far beyond their upload size.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_entries: usize,
    pub max_total_bytes: u64,
    /// Deepest accepted entry, in path components. Keep this equal to the
    /// walk depth so every extracted project can be walked again.
    pub max_depth: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            max_depth: walk::DEFAULT_MAX_DEPTH,
        }
    }
}

/// What an extraction produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Archive entry names, in archive order.
    pub entries: Vec<String>,
    /// Uncompressed bytes written.
    pub bytes_written: u64,
}

impl ExtractionReport {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// Reduce a client-supplied file name to its final path component.
pub fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string()
}

/// Reject uploads that are not worth extracting.
pub fn validate_upload(file_name: &str, size: u64, max_bytes: u64) -> Result<(), CoreError> {
    if file_name.is_empty() {
        return Err(CoreError::Validation("No file provided".into()));
    }
    if !file_name.to_lowercase().ends_with(ARCHIVE_EXTENSION) {
        return Err(CoreError::Validation(format!(
            "Only {ARCHIVE_EXTENSION} files are allowed"
        )));
    }
    if size == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "File size exceeds {} limit",
            format_megabytes(max_bytes)
        )));
    }
    Ok(())
}

/// Human-readable size used in limit messages (`100MB`).
pub fn format_megabytes(bytes: u64) -> String {
    format!("{}MB", bytes / (1024 * 1024))
}

/// Extract `bytes` into `dest`, which must not exist yet.
///
/// Entries are written with their relative paths preserved; a later entry
/// with the same name overwrites an earlier one. Entries whose path would
/// leave `dest` abort the extraction.
pub fn extract_archive(
    bytes: &[u8],
    dest: &Path,
    limits: &ExtractLimits,
) -> Result<ExtractionReport, CoreError> {
    if dest.exists() {
        return Err(CoreError::Extraction(format!(
            "destination {} already exists",
            dest.display()
        )));
    }
    let parent = dest
        .parent()
        .ok_or_else(|| CoreError::Extraction("destination has no parent directory".into()))?;
    fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| write_error(parent, e))?;

    let report = unpack(bytes, staging.path(), limits)?;

    fs::rename(staging.path(), dest).map_err(|e| write_error(dest, e))?;
    // The staging guard now points at nothing; dropping it is a no-op.
    drop(staging);

    tracing::debug!(
        dest = %dest.display(),
        entries = report.count(),
        bytes = report.bytes_written,
        "Archive extracted"
    );
    Ok(report)
}

fn unpack(bytes: &[u8], dest: &Path, limits: &ExtractLimits) -> Result<ExtractionReport, CoreError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CoreError::Extraction(format!("Invalid or corrupt archive: {e}")))?;

    if archive.len() > limits.max_entries {
        return Err(CoreError::LimitExceeded(format!(
            "archive has {} entries, limit is {}",
            archive.len(),
            limits.max_entries
        )));
    }

    let mut entries = Vec::with_capacity(archive.len());
    let mut bytes_written: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| CoreError::Extraction(format!("Failed to read entry {index}: {e}")))?;
        let name = entry.name().to_string();

        let relative = entry.enclosed_name().ok_or_else(|| {
            CoreError::Extraction(format!("entry '{name}' escapes the destination directory"))
        })?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let depth = relative.components().count();
        if depth > limits.max_depth {
            return Err(CoreError::LimitExceeded(format!(
                "entry '{name}' is nested {depth} levels deep, limit is {}",
                limits.max_depth
            )));
        }
        let output = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&output).map_err(|e| write_error(&relative, e))?;
        } else {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(&relative, e))?;
            }
            let remaining = limits.max_total_bytes - bytes_written;
            let mut file = fs::File::create(&output).map_err(|e| write_error(&relative, e))?;
            let copied = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut file)
                .map_err(|e| write_error(&relative, e))?;
            if copied > remaining {
                return Err(CoreError::LimitExceeded(format!(
                    "archive expands beyond {} bytes",
                    limits.max_total_bytes
                )));
            }
            bytes_written += copied;
        }

        entries.push(name);
    }

    Ok(ExtractionReport {
        entries,
        bytes_written,
    })
}

fn write_error(path: &Path, err: io::Error) -> CoreError {
    CoreError::Extraction(format!("Failed to write {}: {err}", path.display()))
}
