use std::path::{Path, PathBuf};

use serde::Serialize;

use flexdeps_core::fs::{canonicalize_if_possible, collect_files_with_extensions, modified_time};
use flexdeps_index::{find_source_root, Project};

use crate::graph::{dependency_projects, describe_chain, Traversal};
use crate::{BuildContext, Result};

/// Why a project needs to be rebuilt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StaleReason {
    /// The project has never produced anything.
    MissingArtifactFolder { folder: PathBuf },
    /// A project it depends on needs rebuilding.
    StaleDependency { project: PathBuf },
    MissingArtifact { artifact: PathBuf },
    /// A source file was modified after the artifact was written.
    NewerSource { source: PathBuf, artifact: PathBuf },
}

impl BuildContext<'_> {
    /// Whether `project` or any project it transitively depends on must be rebuilt.
    pub fn must_build(&self, project: &Path) -> Result<bool> {
        Ok(self.staleness(project)?.is_some())
    }

    /// Like [`must_build`](Self::must_build), reporting the first reason found.
    pub fn staleness(&self, project: &Path) -> Result<Option<StaleReason>> {
        let mut traversal = Traversal::new();
        self.staleness_in(project, &mut traversal)
    }

    fn staleness_in(
        &self,
        project: &Path,
        traversal: &mut Traversal<Option<StaleReason>>,
    ) -> Result<Option<StaleReason>> {
        if !project.exists() {
            return Ok(None);
        }
        let project = canonicalize_if_possible(project);

        if let Some(chain) = traversal.cycle_to(&project) {
            tracing::warn!(
                target = "flexdeps.build",
                cycle = %describe_chain(&chain),
                "dependency cycle; not following it further"
            );
            return Ok(None);
        }
        if let Some(verdict) = traversal.finished(&project) {
            return Ok(verdict);
        }

        traversal.enter(&project);
        let verdict = self.evaluate_staleness(&project, traversal)?;
        tracing::debug!(
            target = "flexdeps.build",
            project = %project.display(),
            verdict = ?verdict,
            "evaluated staleness"
        );
        traversal.leave(&project, verdict.clone());
        Ok(verdict)
    }

    fn evaluate_staleness(
        &self,
        project: &Path,
        traversal: &mut Traversal<Option<StaleReason>>,
    ) -> Result<Option<StaleReason>> {
        let Some(source_root) = find_source_root(project, self.layout, self.quiet) else {
            return Ok(None);
        };

        let folder = self.layout.artifact_dir(project);
        if !folder.is_dir() {
            return Ok(Some(StaleReason::MissingArtifactFolder { folder }));
        }

        for dependency in dependency_projects(self, project, &source_root)? {
            if self.staleness_in(&dependency, traversal)?.is_some() {
                return Ok(Some(StaleReason::StaleDependency {
                    project: dependency,
                }));
            }
        }

        let project = Project::classify(project, source_root, self.layout);
        let artifact = project.artifact().to_path_buf();
        let Ok(built_at) = modified_time(&artifact) else {
            return Ok(Some(StaleReason::MissingArtifact { artifact }));
        };

        let sources =
            collect_files_with_extensions(&project.source_root, &self.layout.source_extensions());
        for source in sources {
            let Ok(modified) = modified_time(&source) else {
                continue;
            };
            if modified > built_at {
                return Ok(Some(StaleReason::NewerSource { source, artifact }));
            }
        }

        Ok(None)
    }
}
