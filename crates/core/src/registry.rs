//! The on-disk project registry.
//!
//! There is no database: a project is a directory under `extracted/`,
//! named by its id. Its raw upload and a small JSON sidecar with the
//! original file name and size live under `uploads/`; built packages live
//! under `packages/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::editor;
use crate::error::CoreError;
use crate::extract::{self, ExtractLimits};
use crate::package::{self, PackageDescriptor, PackageInfo};
use crate::paths::validate_segment;
use crate::tree::{self, count_entries, FileNode};
use crate::types::{new_id, timestamp_from, ProjectId, Timestamp};
use crate::walk::WalkOptions;

pub const UPLOADS_DIR: &str = "uploads";
pub const EXTRACTED_DIR: &str = "extracted";
pub const PACKAGES_DIR: &str = "packages";

/// Size and traversal bounds applied by the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_upload_bytes: u64,
    pub extract: ExtractLimits,
    pub walk: WalkOptions,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: extract::DEFAULT_MAX_UPLOAD_BYTES,
            extract: ExtractLimits::default(),
            walk: WalkOptions::default(),
        }
    }
}

/// Sidecar record written next to the raw upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_at: Timestamp,
    /// File name of the raw archive under `uploads/`.
    pub stored_archive: String,
    pub extracted_file_count: usize,
}

/// A project as shown in listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub file_name: String,
    pub uploaded_at: Timestamp,
    pub file_size: u64,
    /// Names of the project root's direct children.
    pub extracted_files: Vec<String>,
    /// Entries in the whole tree, directories included.
    pub extracted_file_count: usize,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub upload_id: ProjectId,
    pub file_name: String,
    pub file_size: u64,
    pub extracted_files: Vec<String>,
    pub extracted_file_count: usize,
}

/// Filesystem-backed project store rooted at a base directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    base: PathBuf,
    limits: StoreLimits,
}

impl ProjectStore {
    pub fn new(base: impl Into<PathBuf>, limits: StoreLimits) -> Self {
        Self {
            base: base.into(),
            limits,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.base.join(UPLOADS_DIR)
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.base.join(EXTRACTED_DIR)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.base.join(PACKAGES_DIR)
    }

    /// Create the three namespaces if missing.
    pub fn ensure_layout(&self) -> Result<(), CoreError> {
        for dir in [self.uploads_dir(), self.extracted_dir(), self.packages_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                CoreError::Internal(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    // ── Upload ───────────────────────────────────────────────────────

    /// Validate, store and extract an uploaded archive as a new project.
    ///
    /// Nothing is created when validation fails. When extraction fails the
    /// stored raw archive is removed again and no project directory exists.
    pub fn ingest(&self, raw_file_name: &str, bytes: &[u8]) -> Result<UploadOutcome, CoreError> {
        let file_name = extract::sanitize_file_name(raw_file_name);
        let file_size = bytes.len() as u64;
        extract::validate_upload(&file_name, file_size, self.limits.max_upload_bytes)?;

        let id = new_id();
        let stored_archive = format!("{id}-{file_name}");
        validate_segment("file name", &stored_archive)?;

        self.ensure_layout()?;
        let stored_path = self.uploads_dir().join(&stored_archive);
        fs::write(&stored_path, bytes).map_err(|e| {
            CoreError::Internal(format!("Failed to store {}: {e}", stored_path.display()))
        })?;

        let project_root = self.extracted_dir().join(&id);
        let report = match extract::extract_archive(bytes, &project_root, &self.limits.extract) {
            Ok(report) => report,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&stored_path) {
                    tracing::warn!(path = %stored_path.display(), error = %cleanup, "Failed to remove stored upload");
                }
                return Err(e);
            }
        };

        // Counted on disk, like listings do: archives often omit directory
        // entries that extraction creates implicitly.
        let extracted_file_count = match tree::read_tree(&project_root, &self.limits.walk.best_effort()) {
            Ok(tree) => count_entries(&tree),
            Err(e) => {
                tracing::warn!(project_id = %id, error = %e, "Failed to count extracted entries");
                report.count()
            }
        };

        let record = ProjectRecord {
            id: id.clone(),
            file_name: file_name.clone(),
            file_size,
            uploaded_at: chrono::Utc::now(),
            stored_archive,
            extracted_file_count,
        };
        if let Err(e) = self.save_record(&record) {
            // Listings fall back to directory metadata without a sidecar.
            tracing::warn!(project_id = %id, error = %e, "Failed to write project sidecar");
        }

        tracing::info!(
            project_id = %id,
            file_name = %file_name,
            file_size,
            entries = extracted_file_count,
            "Project created from upload"
        );

        Ok(UploadOutcome {
            upload_id: id,
            file_name,
            file_size,
            extracted_files: report.entries,
            extracted_file_count,
        })
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Directory of an existing project.
    pub fn project_root(&self, id: &str) -> Result<PathBuf, CoreError> {
        validate_segment("project id", id)?;
        let root = self.extracted_dir().join(id);
        // Hidden entries (staging directories) are never projects.
        if id.starts_with('.') || !root.is_dir() {
            return Err(CoreError::not_found("Project", id));
        }
        Ok(root)
    }

    /// Summary of a single project.
    pub fn get(&self, id: &str) -> Result<ProjectSummary, CoreError> {
        let root = self.project_root(id)?;
        self.summarize(id, &root)
    }

    /// Full file tree of a project, re-read from disk.
    pub fn tree(&self, id: &str) -> Result<Vec<FileNode>, CoreError> {
        let root = self.project_root(id)?;
        tree::read_tree(&root, &self.limits.walk.best_effort())
    }

    /// Every project under the extraction root, newest first.
    ///
    /// Projects that cannot be read are logged and left out.
    pub fn list(&self) -> Result<Vec<ProjectSummary>, CoreError> {
        let extracted = self.extracted_dir();
        let entries = match fs::read_dir(&extracted) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CoreError::DirectoryRead {
                    path: extracted,
                    source,
                })
            }
        };

        let mut projects = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let id = entry.file_name().to_string_lossy().into_owned();
            if id.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            match self.summarize(&id, &entry.path()) {
                Ok(summary) => projects.push(summary),
                Err(e) => tracing::warn!(project_id = %id, error = %e, "Skipping unreadable project"),
            }
        }

        projects.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(projects)
    }

    // ── Files ────────────────────────────────────────────────────────

    pub fn read_file(&self, id: &str, relative: &str) -> Result<String, CoreError> {
        let root = self.project_root(id)?;
        editor::read_text(&root, relative)
    }

    pub fn write_file(&self, id: &str, relative: &str, content: &str) -> Result<(), CoreError> {
        let root = self.project_root(id)?;
        editor::write_text(&root, relative, content)?;
        tracing::info!(project_id = %id, path = relative, bytes = content.len(), "Project file updated");
        Ok(())
    }

    // ── Deletion ─────────────────────────────────────────────────────

    /// Remove a project's tree, then its raw upload and sidecar.
    ///
    /// Built packages are kept.
    pub fn delete(&self, id: &str) -> Result<(), CoreError> {
        let root = self.project_root(id)?;
        let record = self.load_record(id);

        let summary = tree::remove_tree(&root, &self.limits.walk)?;

        if let Some(record) = &record {
            if validate_segment("file name", &record.stored_archive).is_ok() {
                remove_if_present(&self.uploads_dir().join(&record.stored_archive));
            }
        }
        remove_if_present(&self.record_path(id));

        tracing::info!(
            project_id = %id,
            files = summary.files,
            directories = summary.directories,
            "Project deleted"
        );
        Ok(())
    }

    // ── Packages ─────────────────────────────────────────────────────

    pub fn build_package(&self, id: &str) -> Result<PackageDescriptor, CoreError> {
        let root = self.project_root(id)?;
        package::build_package(&root, id, &self.packages_dir(), &self.limits.walk)
    }

    pub fn package_info(&self, id: &str) -> Result<PackageInfo, CoreError> {
        let root = self.project_root(id)?;
        package::package_info(&root, id, &self.limits.walk)
    }

    /// Path of a built package. The project itself need not exist anymore.
    pub fn locate_package(&self, id: &str, package_id: &str) -> Result<PathBuf, CoreError> {
        package::locate_package(&self.packages_dir(), id, package_id)
    }

    pub fn delete_package(&self, id: &str, package_id: &str) -> Result<(), CoreError> {
        package::delete_package(&self.packages_dir(), id, package_id)?;
        tracing::info!(project_id = %id, package_id, "Package deleted");
        Ok(())
    }

    // ── Sidecars ─────────────────────────────────────────────────────

    fn record_path(&self, id: &str) -> PathBuf {
        self.uploads_dir().join(format!("{id}.json"))
    }

    fn save_record(&self, record: &ProjectRecord) -> Result<(), CoreError> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| CoreError::Internal(format!("Failed to encode sidecar: {e}")))?;
        let path = self.record_path(&record.id);
        fs::write(&path, json)
            .map_err(|e| CoreError::Internal(format!("Failed to write {}: {e}", path.display())))
    }

    /// Load a project's sidecar, if there is a readable one.
    pub fn load_record(&self, id: &str) -> Option<ProjectRecord> {
        let path = self.record_path(id);
        let raw = fs::read(&path).ok()?;
        match serde_json::from_slice(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed project sidecar");
                None
            }
        }
    }

    fn summarize(&self, id: &str, root: &Path) -> Result<ProjectSummary, CoreError> {
        let tree = tree::read_tree(root, &self.limits.walk.best_effort())?;
        let extracted_files = tree.iter().map(|node| node.name.clone()).collect();
        let extracted_file_count = count_entries(&tree);

        let (file_name, file_size, uploaded_at) = match self.load_record(id) {
            Some(record) => (record.file_name, record.file_size, record.uploaded_at),
            None => {
                let metadata = fs::metadata(root).map_err(|source| CoreError::DirectoryRead {
                    path: root.to_path_buf(),
                    source,
                })?;
                let created = metadata.created().or_else(|_| metadata.modified()).ok();
                (id.to_string(), 0, timestamp_from(created))
            }
        };

        Ok(ProjectSummary {
            id: id.to_string(),
            file_name,
            uploaded_at,
            file_size,
            extracted_files,
            extracted_file_count,
        })
    }
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Nothing to remove");
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}
