use std::fs;
use std::io;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::filter::{list_paths, FilterToken, ListOptions, PathFilter};

/// Recursively collect files under `root` whose extension is one of `extensions`
/// (compared case-insensitively).
///
/// Missing directories are treated as empty. Dot-prefixed paths are skipped.
pub fn collect_files_with_extensions(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let filter = PathFilter::files().with_token(FilterToken::ExcludeDotNames);
    list_paths(root, &filter, ListOptions::default())
        .into_iter()
        .filter(|path| has_extension(path, extensions))
        .collect()
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

pub fn modified_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Canonicalize `path`, falling back to the input when it does not exist.
pub fn canonicalize_if_possible(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Whether two paths name the same location once symlinks are resolved.
///
/// Comparison ignores case on platforms whose default filesystems do.
pub fn same_path(a: &Path, b: &Path) -> bool {
    let a = canonicalize_if_possible(a);
    let b = canonicalize_if_possible(b);
    if cfg!(any(windows, target_os = "macos")) {
        a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
    } else {
        a == b
    }
}

/// Remove a file, ignoring a missing target.
///
/// Returns whether a file was actually deleted.
#[track_caller]
pub fn remove_file_best_effort(path: &Path, reason: &'static str) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => {
            let loc = Location::caller();
            tracing::warn!(
                target = "flexdeps.core",
                path = %path.display(),
                reason,
                file = loc.file(),
                line = loc.line(),
                error = %err,
                "failed to remove file (best effort)"
            );
            false
        }
    }
}
