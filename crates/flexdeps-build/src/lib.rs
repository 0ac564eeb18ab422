//! Dependency resolution and rebuild decisions across a workspace.
//!
//! The four operations consumed by script generation live here or are
//! re-exported: [`BuildContext::index`], [`resolve`], [`BuildContext::must_build`]
//! and [`BuildContext::invalidate`].

mod graph;
mod invalidate;
mod resolve;
mod staleness;

pub use invalidate::InvalidationReport;
pub use resolve::{resolve, resolve_detailed, Collision, Resolution};
pub use staleness::StaleReason;

use std::path::{Path, PathBuf};

use thiserror::Error;

use flexdeps_archive::ArchiveInspector;
use flexdeps_config::LayoutConfig;
use flexdeps_core::ClassReference;
use flexdeps_index::{
    ClassField, IndexError, IndexStore, InclusionIndex, LibraryIndexer, Project,
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("cannot determine the workspace containing {path}")]
    NoWorkspace { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// Everything an operation needs to know about its environment.
///
/// Passed explicitly to every operation; there is no process-wide state.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub layout: &'a LayoutConfig,
    pub inspector: &'a dyn ArchiveInspector,
    pub store: &'a dyn IndexStore,
    /// Silence warnings about ambiguous source roots.
    pub quiet: bool,
}

impl<'a> BuildContext<'a> {
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

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn indexer(&self) -> LibraryIndexer<'a> {
        LibraryIndexer::new(self.layout, self.inspector, self.store).quiet(self.quiet)
    }

    /// Build or load the index of `workspace_root`.
    pub fn index(&self, workspace_root: &Path, reuse_cache: bool) -> Result<InclusionIndex> {
        Ok(self
            .indexer()
            .build_or_load_index(workspace_root, reuse_cache)?)
    }

    pub fn open_project(&self, project: &Path) -> Option<Project> {
        Project::open(project, self.layout, self.quiet)
    }

    /// Class references found in the source files below `source_root`, sorted.
    pub fn project_imports(&self, source_root: &Path) -> Vec<ClassReference> {
        flexdeps_scan::list_class_imports(source_root, self.layout)
    }

    /// Artifacts the sources under `source_root` depend on, resolved against
    /// the (cached) index of the project's workspace. May include the
    /// project's own artifact.
    pub fn resolve_project(&self, project: &Path, source_root: &Path) -> Result<Vec<PathBuf>> {
        let workspace = workspace_of(project)?;
        let index = self.index(&workspace, true)?;
        let imports = self.project_imports(source_root);
        Ok(resolve(&index, &imports, ClassField::Qualified))
    }
}

/// The workspace a project lives in: its parent directory.
pub fn workspace_of(project: &Path) -> Result<PathBuf> {
    project
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| BuildError::NoWorkspace {
            path: project.to_path_buf(),
        })
}

/// The project owning an artifact: two levels up from the artifact file.
pub fn owning_project(artifact: &Path) -> Option<&Path> {
    artifact.parent()?.parent()
}
