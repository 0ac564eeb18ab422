use std::path::{Path, PathBuf};

use serde::Serialize;

use flexdeps_core::fs::{canonicalize_if_possible, remove_file_best_effort};
use flexdeps_index::{find_source_root, Project};

use crate::graph::{dependency_projects, describe_chain, Traversal};
use crate::{workspace_of, BuildContext, Result};

/// What an invalidation removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Artifacts deleted, dependencies before the projects that need them.
    pub removed_artifacts: Vec<PathBuf>,
    /// Whether the workspace index cache was deleted.
    pub index_removed: bool,
}

impl BuildContext<'_> {
    /// Delete the artifacts of `project` and of every project it depends on.
    ///
    /// The workspace index cache is deleted last, and only when
    /// `keep_index_cache` is false; dependencies are always cleaned with the
    /// cache kept so it is removed at most once.
    pub fn invalidate(&self, project: &Path, keep_index_cache: bool) -> Result<InvalidationReport> {
        let mut report = InvalidationReport::default();
        let mut traversal = Traversal::new();
        self.invalidate_in(project, keep_index_cache, &mut traversal, &mut report)?;
        Ok(report)
    }

    fn invalidate_in(
        &self,
        project: &Path,
        keep_index_cache: bool,
        traversal: &mut Traversal<()>,
        report: &mut InvalidationReport,
    ) -> Result<()> {
        if !project.exists() {
            return Ok(());
        }
        let project = canonicalize_if_possible(project);

        if let Some(chain) = traversal.cycle_to(&project) {
            tracing::warn!(
                target = "flexdeps.build",
                cycle = %describe_chain(&chain),
                "dependency cycle; not following it further"
            );
            return Ok(());
        }
        if traversal.finished(&project).is_some() {
            return Ok(());
        }

        traversal.enter(&project);
        if let Some(source_root) = find_source_root(&project, self.layout, self.quiet) {
            for dependency in dependency_projects(self, &project, &source_root)? {
                self.invalidate_in(&dependency, true, traversal, report)?;
            }

            let info = Project::classify(&project, source_root, self.layout);
            if remove_file_best_effort(info.artifact(), "invalidate") {
                tracing::info!(
                    target = "flexdeps.build",
                    artifact = %info.artifact().display(),
                    "removed artifact"
                );
                report.removed_artifacts.push(info.artifact().to_path_buf());
            }
        }
        traversal.leave(&project, ());

        if !keep_index_cache {
            let workspace = workspace_of(&project)?;
            report.index_removed = self.store.remove(&workspace)?;
            if report.index_removed {
                tracing::info!(
                    target = "flexdeps.build",
                    workspace = %workspace.display(),
                    "removed index cache"
                );
            }
        }
        Ok(())
    }
}
