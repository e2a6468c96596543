//! Project tree listing and recursive removal.
//!
//! Both are thin [`Visitor`]s over [`crate::walk::walk`], so listing order,
//! depth bounds and cycle handling are identical to what the package
//! builder sees.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::paths::to_slash;
use crate::types::{timestamp_from, Timestamp};
use crate::walk::{walk, Visitor, WalkEntry, WalkOptions, WalkSummary};

/// One file or directory in a project tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// Byte size; always 0 for directories.
    pub size: u64,
    pub is_directory: bool,
    pub last_modified: Timestamp,
    /// Present for directories only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    fn from_entry(entry: &WalkEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: to_slash(&entry.relative),
            size: entry.size,
            is_directory: entry.is_dir,
            last_modified: timestamp_from(entry.modified),
            children: entry.is_dir.then(Vec::new),
        }
    }
}

/// Assembles nested [`FileNode`]s from walk callbacks.
#[derive(Default)]
struct TreeBuilder {
    roots: Vec<FileNode>,
    open: Vec<FileNode>,
}

impl TreeBuilder {
    fn attach(&mut self, node: FileNode) {
        match self.open.last_mut().and_then(|dir| dir.children.as_mut()) {
            Some(children) => children.push(node),
            None => self.roots.push(node),
        }
    }
}

impl Visitor for TreeBuilder {
    fn enter_dir(&mut self, entry: &WalkEntry) -> Result<(), CoreError> {
        self.open.push(FileNode::from_entry(entry));
        Ok(())
    }

    fn visit_file(&mut self, entry: &WalkEntry) -> Result<(), CoreError> {
        self.attach(FileNode::from_entry(entry));
        Ok(())
    }

    fn leave_dir(&mut self, _entry: &WalkEntry) -> Result<(), CoreError> {
        if let Some(dir) = self.open.pop() {
            self.attach(dir);
        }
        Ok(())
    }
}

/// Materialize the full tree below `dir` (children of `dir`, recursively).
///
/// Fails with [`CoreError::DirectoryRead`] when `dir` itself cannot be
/// listed. Use [`WalkOptions::best_effort`] to tolerate subdirectories that
/// vanish or cannot be read during the walk.
pub fn read_tree(dir: &Path, options: &WalkOptions) -> Result<Vec<FileNode>, CoreError> {
    let mut builder = TreeBuilder::default();
    walk(dir, options, &mut builder)?;
    Ok(builder.roots)
}

/// Total number of nodes (files and directories) in a tree.
pub fn count_entries(nodes: &[FileNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + node.children.as_deref().map_or(0, count_entries))
        .sum()
}

/// Number of regular files (directories excluded) in a tree.
pub fn count_files(nodes: &[FileNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node.children.as_deref() {
            Some(children) => count_files(children),
            None => 1,
        })
        .sum()
}

/// Sum of file sizes in a tree.
pub fn total_size(nodes: &[FileNode]) -> u64 {
    nodes
        .iter()
        .map(|node| node.size + node.children.as_deref().map_or(0, total_size))
        .sum()
}

/// Removes files on the way down and directories on the way back up.
struct Remover;

impl Visitor for Remover {
    fn visit_file(&mut self, entry: &WalkEntry) -> Result<(), CoreError> {
        fs::remove_file(&entry.path).map_err(|e| removal_error(&entry.path, e))
    }

    fn leave_dir(&mut self, entry: &WalkEntry) -> Result<(), CoreError> {
        fs::remove_dir(&entry.path).map_err(|e| removal_error(&entry.path, e))
    }
}

/// Delete `path` and everything below it.
///
/// Links are removed, never followed. A `path` that is itself a link is
/// unlinked without touching its target. Depth and entry bounds in
/// `options` are ignored so that no tree is ever too large to delete.
pub fn remove_tree(path: &Path, options: &WalkOptions) -> Result<WalkSummary, CoreError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CoreError::not_found("Directory", path.display().to_string()));
        }
        Err(e) => return Err(removal_error(path, e)),
    };

    if !metadata.is_dir() {
        fs::remove_file(path).map_err(|e| removal_error(path, e))?;
        return Ok(WalkSummary {
            files: 1,
            ..WalkSummary::default()
        });
    }

    let options = WalkOptions {
        max_depth: usize::MAX,
        max_entries: usize::MAX,
        ..options.without_links().strict()
    };
    let mut summary = walk(path, &options, &mut Remover)?;
    fs::remove_dir(path).map_err(|e| removal_error(path, e))?;
    summary.directories += 1;
    Ok(summary)
}

fn removal_error(path: &Path, err: io::Error) -> CoreError {
    CoreError::Internal(format!("Failed to remove {}: {err}", path.display()))
}
