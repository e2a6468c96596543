//! Rebuilding a project into a downloadable package archive.
//!
//! A package holds every entry of the project tree under a
//! `<project id>/` prefix, followed by two generated entries:
//! `package.json` with the package metadata and a `README.md` notice.
//! The byte size of the finished archive cannot be known while it is being
//! written, so the embedded `package.json` reports `fileSize: 0`; the
//! descriptor returned by [`build_package`] carries the real size.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::CoreError;
use crate::paths::{to_slash, validate_segment};
use crate::tree::{count_files, read_tree, total_size};
use crate::types::{new_id, Timestamp};
use crate::walk::{walk, Visitor, WalkEntry, WalkOptions};

pub const PACKAGE_VERSION: &str = "1.0.0";
pub const PACKAGE_DESCRIPTION: &str = "Uploaded project package";
pub const METADATA_ENTRY: &str = "package.json";
pub const NOTICE_ENTRY: &str = "README.md";

/// Number of generated entries appended after the project tree.
pub const GENERATED_ENTRIES: usize = 2;

/// Characters of the package id kept in the package file name.
const PACKAGE_ID_PREFIX_LEN: usize = 8;

/// Metadata describing a built package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    pub id: String,
    pub project_id: String,
    pub file_name: String,
    pub package_name: String,
    pub version: String,
    pub description: String,
    pub created_at: Timestamp,
    /// Archive size in bytes (0 inside the archive itself).
    pub file_size: u64,
    /// Number of archive entries, generated entries included.
    pub file_count: usize,
}

/// Packaging feasibility for a project, computed without building.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub project_id: String,
    pub package_name: String,
    pub version: String,
    pub description: String,
    /// Sum of project file sizes, before compression.
    pub estimated_size: u64,
    /// Entries the package would contain, generated entries included.
    pub file_count: usize,
    pub can_package: bool,
}

pub fn package_name(project_id: &str) -> String {
    format!("Project {project_id}")
}

/// Deterministic archive name for a project/package pair.
pub fn package_file_name(project_id: &str, package_id: &str) -> String {
    let short: String = package_id.chars().take(PACKAGE_ID_PREFIX_LEN).collect();
    format!("project-{project_id}-{short}.zip")
}

/// Build a package for the project rooted at `project_root` into
/// `packages_dir`.
///
/// The archive is assembled in a temporary file inside `packages_dir` and
/// moved to its final name only once complete.
pub fn build_package(
    project_root: &Path,
    project_id: &str,
    packages_dir: &Path,
    options: &WalkOptions,
) -> Result<PackageDescriptor, CoreError> {
    validate_segment("project id", project_id)?;
    if !project_root.is_dir() {
        return Err(CoreError::Build(format!(
            "source directory {} is missing",
            project_root.display()
        )));
    }
    fs::create_dir_all(packages_dir).map_err(|e| build_error(packages_dir, e))?;

    let package_id = new_id();
    let file_name = package_file_name(project_id, &package_id);
    let dest = packages_dir.join(&file_name);

    let mut staged = tempfile::Builder::new()
        .prefix(".building-")
        .suffix(".zip")
        .tempfile_in(packages_dir)
        .map_err(|e| build_error(packages_dir, e))?;

    let mut descriptor = {
        let mut archiver = Archiver {
            writer: ZipWriter::new(staged.as_file_mut()),
            options: SimpleFileOptions::default(),
            prefix: project_id.to_string(),
            entries: 0,
        };

        walk(project_root, &options.strict(), &mut archiver).map_err(|e| match e {
            CoreError::DirectoryRead { path, source } => {
                CoreError::Build(format!("cannot read {}: {source}", path.display()))
            }
            other => other,
        })?;

        let descriptor = PackageDescriptor {
            id: package_id,
            project_id: project_id.to_string(),
            file_name: file_name.clone(),
            package_name: package_name(project_id),
            version: PACKAGE_VERSION.to_string(),
            description: PACKAGE_DESCRIPTION.to_string(),
            created_at: chrono::Utc::now(),
            file_size: 0,
            file_count: archiver.entries + GENERATED_ENTRIES,
        };

        let metadata = serde_json::to_vec_pretty(&descriptor)
            .map_err(|e| CoreError::Build(format!("cannot encode {METADATA_ENTRY}: {e}")))?;
        archiver.add_generated(METADATA_ENTRY, &metadata)?;
        archiver.add_generated(NOTICE_ENTRY, render_notice(&descriptor).as_bytes())?;

        archiver
            .writer
            .finish()
            .map_err(|e| CoreError::Build(format!("cannot finalize archive: {e}")))?;
        descriptor
    };

    staged
        .as_file()
        .sync_all()
        .map_err(|e| build_error(&dest, e))?;
    staged.persist(&dest).map_err(|e| build_error(&dest, e.error))?;

    descriptor.file_size = fs::metadata(&dest)
        .map_err(|e| build_error(&dest, e))?
        .len();

    tracing::info!(
        project_id,
        package_id = %descriptor.id,
        file_name = %descriptor.file_name,
        file_size = descriptor.file_size,
        file_count = descriptor.file_count,
        "Package built"
    );
    Ok(descriptor)
}

/// Describe what packaging the project would produce.
pub fn package_info(
    project_root: &Path,
    project_id: &str,
    options: &WalkOptions,
) -> Result<PackageInfo, CoreError> {
    let (estimated_size, file_count, can_package) = match read_tree(project_root, &options.strict()) {
        Ok(tree) => (
            total_size(&tree),
            count_files(&tree) + GENERATED_ENTRIES,
            true,
        ),
        Err(CoreError::LimitExceeded(reason)) => {
            tracing::warn!(project_id, %reason, "Project too large to package");
            (0, 0, false)
        }
        Err(e) => return Err(e),
    };

    Ok(PackageInfo {
        project_id: project_id.to_string(),
        package_name: package_name(project_id),
        version: PACKAGE_VERSION.to_string(),
        description: PACKAGE_DESCRIPTION.to_string(),
        estimated_size,
        file_count,
        can_package,
    })
}

/// Path of an existing package file.
pub fn locate_package(
    packages_dir: &Path,
    project_id: &str,
    package_id: &str,
) -> Result<PathBuf, CoreError> {
    validate_segment("project id", project_id)?;
    validate_segment("package id", package_id)?;

    let path = packages_dir.join(package_file_name(project_id, package_id));
    if !path.is_file() {
        return Err(CoreError::not_found("Package", package_id));
    }
    Ok(path)
}

/// Remove a previously built package file.
pub fn delete_package(
    packages_dir: &Path,
    project_id: &str,
    package_id: &str,
) -> Result<(), CoreError> {
    let path = locate_package(packages_dir, project_id, package_id)?;
    fs::remove_file(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CoreError::not_found("Package", package_id),
        _ => CoreError::Internal(format!("Failed to remove {}: {e}", path.display())),
    })
}

/// Writes walked files into the archive under the project prefix.
/// Directories are implied by file paths and get no entries of their own.
struct Archiver<W: Write + io::Seek> {
    writer: ZipWriter<W>,
    options: SimpleFileOptions,
    prefix: String,
    entries: usize,
}

impl<W: Write + io::Seek> Archiver<W> {
    fn entry_name(&self, entry: &WalkEntry) -> String {
        format!("{}/{}", self.prefix, to_slash(&entry.relative))
    }

    fn add_generated(&mut self, name: &str, content: &[u8]) -> Result<(), CoreError> {
        self.writer
            .start_file(name, self.options)
            .map_err(|e| CoreError::Build(format!("cannot add {name}: {e}")))?;
        self.writer
            .write_all(content)
            .map_err(|e| CoreError::Build(format!("cannot add {name}: {e}")))
    }
}

impl<W: Write + io::Seek> Visitor for Archiver<W> {
    fn visit_file(&mut self, entry: &WalkEntry) -> Result<(), CoreError> {
        let name = self.entry_name(entry);
        let mut source = fs::File::open(&entry.path).map_err(|e| build_error(&entry.path, e))?;
        self.writer
            .start_file(name.as_str(), self.options)
            .map_err(|e| CoreError::Build(format!("cannot add {name}: {e}")))?;
        io::copy(&mut source, &mut self.writer).map_err(|e| build_error(&entry.path, e))?;
        self.entries += 1;
        Ok(())
    }
}

fn render_notice(descriptor: &PackageDescriptor) -> String {
    let PackageDescriptor {
        project_id,
        version,
        created_at,
        ..
    } = descriptor;
    let packaged = created_at.format("%Y-%m-%d");

    format!(
        "# {name}\n\
         \n\
         Package of a project uploaded through the zipdesk portal.\n\
         \n\
         ## Details\n\
         - **Project ID**: {project_id}\n\
         - **Packaged**: {packaged}\n\
         - **Version**: {version}\n\
         \n\
         ## Contents\n\
         The `{project_id}/` folder holds the project files with their original\n\
         directory structure, including any edits made in the portal.\n\
         `{METADATA_ENTRY}` describes this package.\n\
         \n\
         ## Usage\n\
         1. Extract the archive.\n\
         2. Open the `{project_id}/` folder in your editor or IDE.\n",
        name = descriptor.package_name,
    )
}

fn build_error(path: &Path, err: io::Error) -> CoreError {
    CoreError::Build(format!("{}: {err}", path.display()))
}
