//! The one directory traversal used by the tree walker, the package
//! builder and the recursive deleter.
//!
//! Entries are visited depth-first with a fixed sibling order (directories
//! before files, then by name). Directories produce an `enter_dir` call
//! before their children and a `leave_dir` call after the last of them, so
//! the same walk can build a nested tree or remove a tree bottom-up.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

use crate::error::CoreError;

/// Deepest entry accepted below the walk root (direct children are depth 1).
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Maximum number of entries visited in one walk.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Bounds and behaviour of a single walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub max_depth: usize,
    pub max_entries: usize,
    /// Follow symbolic links. Links resolving outside the walk root are
    /// skipped either way.
    pub follow_links: bool,
    /// Skip unreadable subdirectories and over-deep entries instead of
    /// failing the walk.
    pub best_effort: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_entries: DEFAULT_MAX_ENTRIES,
            follow_links: true,
            best_effort: false,
        }
    }
}

impl WalkOptions {
    pub fn best_effort(self) -> Self {
        Self {
            best_effort: true,
            ..self
        }
    }

    pub fn strict(self) -> Self {
        Self {
            best_effort: false,
            ..self
        }
    }

    pub fn without_links(self) -> Self {
        Self {
            follow_links: false,
            ..self
        }
    }
}

/// One visited filesystem entry.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Path as reached by the walk (through link names, not their targets).
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
    pub name: String,
    /// 1 for direct children of the root.
    pub depth: usize,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Callbacks invoked by [`walk`].
///
/// Returning an error from any callback aborts the walk with that error.
pub trait Visitor {
    fn enter_dir(&mut self, _entry: &WalkEntry) -> Result<(), CoreError> {
        Ok(())
    }

    fn visit_file(&mut self, entry: &WalkEntry) -> Result<(), CoreError>;

    fn leave_dir(&mut self, _entry: &WalkEntry) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Counts gathered during a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
}

/// Sibling name order: case-insensitive, exact name as tie-break.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Walk everything below `root`, dispatching to `visitor`.
///
/// The root must be a readable directory; otherwise the walk fails with
/// [`CoreError::DirectoryRead`] before any callback runs.
pub fn walk<V>(root: &Path, options: &WalkOptions, visitor: &mut V) -> Result<WalkSummary, CoreError>
where
    V: Visitor + ?Sized,
{
    let canonical_root = open_root(root)?;

    let follow_links = options.follow_links;
    let mut visited: HashSet<PathBuf> = HashSet::from([canonical_root.clone()]);
    let admit_root = canonical_root.clone();

    let mut entries = WalkDir::new(&canonical_root)
        .min_depth(1)
        .max_depth(options.max_depth.saturating_add(1))
        .follow_links(follow_links)
        .sort_by(compare_entries)
        .into_iter()
        .filter_entry(move |entry| admit(entry, &admit_root, &mut visited, follow_links));

    let mut summary = WalkSummary::default();
    let mut open_dirs: Vec<WalkEntry> = Vec::new();
    let mut seen: usize = 0;

    while let Some(item) = entries.next() {
        let dir_entry = match item {
            Ok(dir_entry) => dir_entry,
            Err(err) => {
                skip_or_fail(err, options)?;
                summary.skipped += 1;
                continue;
            }
        };

        if dir_entry.depth() > options.max_depth {
            if options.best_effort {
                tracing::warn!(
                    path = %dir_entry.path().display(),
                    max_depth = options.max_depth,
                    "Skipping entry nested deeper than the walk limit"
                );
                summary.skipped += 1;
                continue;
            }
            return Err(CoreError::LimitExceeded(format!(
                "directory nesting deeper than {} levels",
                options.max_depth
            )));
        }

        while open_dirs
            .last()
            .is_some_and(|open| open.depth >= dir_entry.depth())
        {
            if let Some(done) = open_dirs.pop() {
                visitor.leave_dir(&done)?;
            }
        }

        seen += 1;
        if seen > options.max_entries {
            return Err(CoreError::LimitExceeded(format!(
                "more than {} entries",
                options.max_entries
            )));
        }

        let entry = match to_walk_entry(&dir_entry, &canonical_root) {
            Ok(entry) => entry,
            Err(err) => {
                skip_or_fail(err, options)?;
                summary.skipped += 1;
                // Children of a skipped directory have no parent to attach to.
                if dir_entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
                continue;
            }
        };

        if entry.is_dir {
            summary.directories += 1;
            visitor.enter_dir(&entry)?;
            open_dirs.push(entry);
        } else {
            summary.files += 1;
            visitor.visit_file(&entry)?;
        }
    }

    while let Some(done) = open_dirs.pop() {
        visitor.leave_dir(&done)?;
    }

    Ok(summary)
}

fn open_root(root: &Path) -> Result<PathBuf, CoreError> {
    let read_error = |source: io::Error| CoreError::DirectoryRead {
        path: root.to_path_buf(),
        source,
    };

    let canonical = root.canonicalize().map_err(read_error)?;
    let metadata = std::fs::metadata(&canonical).map_err(read_error)?;
    if !metadata.is_dir() {
        return Err(read_error(io::Error::other("not a directory")));
    }
    // Surface permission problems on the root itself instead of an empty walk.
    std::fs::read_dir(&canonical).map_err(read_error)?;
    Ok(canonical)
}

fn to_walk_entry(entry: &DirEntry, root: &Path) -> Result<WalkEntry, walkdir::Error> {
    let metadata = entry.metadata()?;
    let is_dir = metadata.is_dir();
    Ok(WalkEntry {
        path: entry.path().to_path_buf(),
        relative: entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf(),
        name: entry.file_name().to_string_lossy().into_owned(),
        depth: entry.depth(),
        is_dir,
        size: if is_dir { 0 } else { metadata.len() },
        modified: metadata.modified().ok(),
    })
}

/// Decide whether a traversal error aborts the walk.
///
/// Link loops and entries that vanished (or dangling links) are always
/// skipped. Anything else is fatal unless the walk is best-effort.
fn skip_or_fail(err: walkdir::Error, options: &WalkOptions) -> Result<(), CoreError> {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();

    if let Some(ancestor) = err.loop_ancestor() {
        tracing::warn!(
            path = %path.display(),
            ancestor = %ancestor.display(),
            "Skipping symbolic link cycle"
        );
        return Ok(());
    }

    let vanished = err
        .io_error()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound);
    if vanished || options.best_effort {
        tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable entry");
        return Ok(());
    }

    Err(CoreError::DirectoryRead {
        path,
        source: err.into(),
    })
}

/// Entry filter: keep links inside the root and enter each directory once.
fn admit(
    entry: &DirEntry,
    root: &Path,
    visited: &mut HashSet<PathBuf>,
    follow_links: bool,
) -> bool {
    if !follow_links {
        return true;
    }

    let is_dir = entry.file_type().is_dir();
    if !entry.path_is_symlink() && !is_dir {
        return true;
    }

    let Ok(canonical) = entry.path().canonicalize() else {
        // Dangling link; walkdir reports it as an error on its own.
        return true;
    };

    if !canonical.starts_with(root) {
        tracing::warn!(
            path = %entry.path().display(),
            target = %canonical.display(),
            "Skipping link that leads outside the walk root"
        );
        return false;
    }

    if is_dir && !visited.insert(canonical) {
        tracing::warn!(
            path = %entry.path().display(),
            "Skipping directory already visited in this walk"
        );
        return false;
    }

    true
}

fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    sorts_as_dir(b)
        .cmp(&sorts_as_dir(a))
        .then_with(|| compare_names(&a.file_name().to_string_lossy(), &b.file_name().to_string_lossy()))
}

fn sorts_as_dir(entry: &DirEntry) -> bool {
    if entry.path_is_symlink() {
        entry.path().is_dir()
    } else {
        entry.file_type().is_dir()
    }
}
