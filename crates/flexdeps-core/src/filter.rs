//! Recursive directory listing with post-hoc filtering.
//!
//! Filters never prune the traversal; they only decide which visited paths end
//! up in the result. Substring patterns (with `*` and `?` wildcards) are OR-ed
//! together, reserved tokens are AND-ed on top of that.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Reserved exclusion tokens understood by [`PathFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterToken {
    FilesOnly,
    FoldersOnly,
    /// Drop any path with a dot-prefixed component below the root.
    ExcludeDotNames,
}

#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    patterns: Vec<String>,
    set: Option<GlobSet>,
    tokens: BTreeSet<FilterToken>,
}

impl PathFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files() -> Self {
        Self::new().with_token(FilterToken::FilesOnly)
    }

    pub fn folders() -> Self {
        Self::new().with_token(FilterToken::FoldersOnly)
    }

    #[must_use]
    pub fn with_token(mut self, token: FilterToken) -> Self {
        self.tokens.insert(token);
        self
    }

    /// Add a substring pattern. `*` matches any run of characters (including
    /// separators) and `?` matches exactly one; everything else is literal.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, globset::Error> {
        self.patterns.push(pattern.to_owned());
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.patterns {
            let glob = GlobBuilder::new(&substring_glob(pattern))
                .literal_separator(false)
                .backslash_escape(false)
                .build()?;
            builder.add(glob);
        }
        self.set = Some(builder.build()?);
        Ok(self)
    }

    pub fn has_token(&self, token: FilterToken) -> bool {
        self.tokens.contains(&token)
    }

    /// `rel` is the root-relative, slash-separated form of the path.
    fn accepts(&self, rel: &str, is_dir: bool) -> bool {
        if self.has_token(FilterToken::FilesOnly) && is_dir {
            return false;
        }
        if self.has_token(FilterToken::FoldersOnly) && !is_dir {
            return false;
        }
        if self.has_token(FilterToken::ExcludeDotNames)
            && rel.split('/').any(|segment| segment.starts_with('.'))
        {
            return false;
        }
        match &self.set {
            Some(set) => set.is_match(rel),
            None => true,
        }
    }
}

/// Wrap a user pattern so it matches anywhere in the candidate path.
fn substring_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('*');
    for ch in pattern.chars() {
        match ch {
            // Runs of `*` collapse; `**` has its own meaning in globs.
            '*' if out.ends_with('*') => {}
            '*' | '?' => out.push(ch),
            '[' | ']' | '{' | '}' | '\\' => {
                out.push('[');
                out.push(ch);
                out.push(']');
            }
            _ => out.push(ch),
        }
    }
    if !out.ends_with('*') {
        out.push('*');
    }
    out
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Return root-relative, slash-separated paths instead of absolute ones.
    pub relative: bool,
    /// Drop the final extension of every returned path.
    pub strip_extension: bool,
}

/// List every path below `root` at any depth that passes `filter`.
///
/// Unreadable directories are skipped with a warning. Results are ordered by
/// path. A missing root yields an empty list.
pub fn list_paths(root: &Path, filter: &PathFilter, options: ListOptions) -> Vec<PathBuf> {
    if filter.has_token(FilterToken::FilesOnly) && filter.has_token(FilterToken::FoldersOnly) {
        return Vec::new();
    }
    if !root.is_dir() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    target = "flexdeps.core",
                    root = %root.display(),
                    error = %err,
                    "skipping unreadable path"
                );
                continue;
            }
        };

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = to_slash(rel);
        if !filter.accepts(&rel, entry.file_type().is_dir()) {
            continue;
        }

        let path = if options.relative {
            PathBuf::from(&rel)
        } else {
            entry.into_path()
        };
        out.push(if options.strip_extension {
            path.with_extension("")
        } else {
            path
        });
    }
    out
}

/// Slash-separated rendering of a relative path, independent of platform.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src/com/acme")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("src/com/acme/Button.as"), "").unwrap();
        std::fs::write(root.join("src/com/acme/Label.mxml"), "").unwrap();
        std::fs::write(root.join(".git/HEAD"), "").unwrap();
        tmp
    }

    #[test]
    fn lists_relative_files_without_extension() {
        let tmp = fixture();
        let filter = PathFilter::files()
            .with_token(FilterToken::ExcludeDotNames)
            .with_pattern(".as")
            .unwrap();
        let found = list_paths(
            tmp.path(),
            &filter,
            ListOptions {
                relative: true,
                strip_extension: true,
            },
        );
        assert_eq!(found, vec![PathBuf::from("src/com/acme/Button")]);
    }

    #[test]
    fn substring_patterns_are_ored() {
        let tmp = fixture();
        let filter = PathFilter::files()
            .with_pattern("*.as")
            .unwrap()
            .with_pattern("Lab?l")
            .unwrap();
        let found = list_paths(
            tmp.path(),
            &filter,
            ListOptions {
                relative: true,
                ..ListOptions::default()
            },
        );
        assert_eq!(
            found,
            vec![
                PathBuf::from("src/com/acme/Button.as"),
                PathBuf::from("src/com/acme/Label.mxml"),
            ]
        );
    }

    #[test]
    fn files_and_folders_only_is_empty() {
        let tmp = fixture();
        let filter = PathFilter::files().with_token(FilterToken::FoldersOnly);
        assert!(list_paths(tmp.path(), &filter, ListOptions::default()).is_empty());
    }

    #[test]
    fn dot_names_are_filtered_but_not_pruned() {
        let tmp = fixture();
        let all = list_paths(tmp.path(), &PathFilter::files(), ListOptions::default());
        assert!(all.iter().any(|p| p.ends_with(".git/HEAD")));

        let filter = PathFilter::files().with_token(FilterToken::ExcludeDotNames);
        let visible = list_paths(tmp.path(), &filter, ListOptions::default());
        assert!(!visible.iter().any(|p| p.ends_with(".git/HEAD")));
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn folders_only_lists_directories() {
        let tmp = fixture();
        let filter = PathFilter::folders().with_token(FilterToken::ExcludeDotNames);
        let found = list_paths(
            tmp.path(),
            &filter,
            ListOptions {
                relative: true,
                ..ListOptions::default()
            },
        );
        assert_eq!(
            found,
            vec![
                PathBuf::from("src"),
                PathBuf::from("src/com"),
                PathBuf::from("src/com/acme"),
            ]
        );
    }
}
