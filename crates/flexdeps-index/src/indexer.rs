use std::path::{Path, PathBuf};

use flexdeps_archive::{ArchiveInspector, CATALOG_ENTRY};
use flexdeps_config::LayoutConfig;
use flexdeps_core::fs::has_extension;

use crate::project::{application_entries, find_source_root, library_classes};
use crate::{IndexError, IndexStore, InclusionIndex, LibraryRecord, Result};

/// Builds the [`InclusionIndex`] of a workspace and keeps it in an [`IndexStore`].
pub struct LibraryIndexer<'a> {
    layout: &'a LayoutConfig,
    inspector: &'a dyn ArchiveInspector,
    store: &'a dyn IndexStore,
    quiet: bool,
}

impl<'a> LibraryIndexer<'a> {
    pub fn new(
        layout: &'a LayoutConfig,
        inspector: &'a dyn ArchiveInspector,
        store: &'a dyn IndexStore,
    ) -> Self {
        Self {
            layout,
            inspector,
            store,
            quiet: false,
        }
    }

    /// Silence warnings about ambiguous source roots.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Return the stored index when `reuse_cache` is set and one is available,
    /// otherwise scan the workspace and store the result.
    ///
    /// A cache hit does not touch any project directory.
    pub fn build_or_load_index(
        &self,
        workspace_root: &Path,
        reuse_cache: bool,
    ) -> Result<InclusionIndex> {
        if reuse_cache {
            if let Some(index) = self.store.load(workspace_root) {
                tracing::debug!(
                    target = "flexdeps.index",
                    workspace = %workspace_root.display(),
                    records = index.len(),
                    "reusing cached index"
                );
                return Ok(index);
            }
        }

        let index = self.scan_workspace(workspace_root)?;
        self.store.save(workspace_root, &index)?;
        Ok(index)
    }

    /// Scan every immediate child directory of `workspace_root` as a project.
    ///
    /// Nothing is persisted.
    pub fn scan_workspace(&self, workspace_root: &Path) -> Result<InclusionIndex> {
        let mut projects: Vec<PathBuf> = std::fs::read_dir(workspace_root)
            .map_err(|source| IndexError::Workspace {
                path: workspace_root.to_path_buf(),
                source,
            })?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(err) => {
                    tracing::warn!(
                        target = "flexdeps.index",
                        workspace = %workspace_root.display(),
                        error = %err,
                        "skipping unreadable workspace entry"
                    );
                    None
                }
            })
            .filter(|path| path.is_dir())
            .collect();
        projects.sort();

        let mut index = InclusionIndex::new();
        for project in &projects {
            self.index_archives(project, &mut index);
            self.index_sources(project, &mut index);
        }

        tracing::info!(
            target = "flexdeps.index",
            workspace = %workspace_root.display(),
            projects = projects.len(),
            records = index.len(),
            "indexed workspace"
        );
        Ok(index)
    }

    /// Index the compiled archives already present in the project's artifact folder.
    fn index_archives(&self, project: &Path, index: &mut InclusionIndex) {
        let artifact_dir = self.layout.artifact_dir(project);
        if !artifact_dir.is_dir() {
            return;
        }

        let entries = match std::fs::read_dir(&artifact_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    target = "flexdeps.index",
                    path = %artifact_dir.display(),
                    error = %err,
                    "skipping unreadable artifact folder"
                );
                return;
            }
        };
        let mut archives: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            // Exploded archives are directories holding the catalog.
            .filter(|path| path.is_file() || path.join(CATALOG_ENTRY).is_file())
            .filter(|path| has_extension(path, &[self.layout.library_extension.as_str()]))
            .collect();
        archives.sort();

        for archive in archives {
            let classes = self
                .inspector
                .list_classes(&archive)
                .into_iter()
                .filter(|class| !class.starts_with('_'));
            let record = LibraryRecord::from_classes(&archive, classes);
            if !index.insert(record) {
                tracing::debug!(
                    target = "flexdeps.index",
                    path = %archive.display(),
                    "archive provides no classes"
                );
            }
        }
    }

    /// Index the library a project builds from its sources. Applications
    /// contribute nothing.
    fn index_sources(&self, project: &Path, index: &mut InclusionIndex) {
        let Some(source_root) = find_source_root(project, self.layout, self.quiet) else {
            return;
        };

        if let Some(entry) = application_entries(&source_root, self.layout).first() {
            tracing::debug!(
                target = "flexdeps.index",
                project = %project.display(),
                entry = %entry.display(),
                "application project; not indexed"
            );
            return;
        }

        let (qualified_classes, unqualified_classes) = library_classes(&source_root, self.layout);
        if !unqualified_classes.is_empty() {
            let names = unqualified_classes
                .iter()
                .map(|class| class.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                target = "flexdeps.index",
                project = %project.display(),
                classes = %names,
                "classes declared without a package"
            );
        }

        index.insert(LibraryRecord {
            artifact_path: self.layout.library_artifact(project),
            qualified_classes,
            unqualified_classes,
        });
    }
}
