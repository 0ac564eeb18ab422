use std::path::{Path, PathBuf};

use flexdeps_core::fs::same_path;

use crate::{owning_project, BuildContext, Result};

/// State threaded through one recursive walk of the dependency graph.
#[derive(Debug)]
pub(crate) struct Traversal<T> {
    /// Projects currently being evaluated, outermost first.
    stack: Vec<PathBuf>,
    /// Results for projects whose evaluation has finished.
    done: Vec<(PathBuf, T)>,
}

impl<T: Clone> Traversal<T> {
    pub(crate) fn new() -> Self {
        Self {
            stack: Vec::new(),
            done: Vec::new(),
        }
    }

    /// If `project` is already being evaluated, the chain of projects that
    /// leads back to it.
    pub(crate) fn cycle_to(&self, project: &Path) -> Option<Vec<PathBuf>> {
        let start = self.stack.iter().position(|p| same_path(p, project))?;
        let mut chain = self.stack[start..].to_vec();
        chain.push(project.to_path_buf());
        Some(chain)
    }

    pub(crate) fn finished(&self, project: &Path) -> Option<T> {
        self.done
            .iter()
            .find(|(p, _)| same_path(p, project))
            .map(|(_, value)| value.clone())
    }

    pub(crate) fn enter(&mut self, project: &Path) {
        self.stack.push(project.to_path_buf());
    }

    pub(crate) fn leave(&mut self, project: &Path, value: T) {
        self.stack.pop();
        self.done.push((project.to_path_buf(), value));
    }
}

pub(crate) fn describe_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Projects owning the artifacts `project` depends on, excluding itself.
///
/// Owners are returned once each, in resolution order.
pub(crate) fn dependency_projects(
    ctx: &BuildContext<'_>,
    project: &Path,
    source_root: &Path,
) -> Result<Vec<PathBuf>> {
    let mut owners: Vec<PathBuf> = Vec::new();
    for artifact in ctx.resolve_project(project, source_root)? {
        let Some(owner) = owning_project(&artifact) else {
            continue;
        };
        if same_path(owner, project) {
            continue;
        }
        if owners.iter().any(|known| same_path(known, owner)) {
            continue;
        }
        owners.push(owner.to_path_buf());
    }
    Ok(owners)
}
