//! Workspace-wide index of which artifact provides which classes.
//!
//! A workspace is a directory of sibling projects. Each project either ships
//! compiled archives, builds a library from its sources, or is an application
//! (which never contributes to the index). The index is computed in a single
//! pass and persisted at the workspace root through an [`IndexStore`].

mod indexer;
mod project;
mod record;
mod store;

pub use indexer::LibraryIndexer;
pub use project::{application_entries, find_source_root, library_classes, Project, ProjectKind};
pub use record::{ClassField, InclusionIndex, LibraryRecord};
pub use store::{IndexStore, JsonIndexStore, MemoryIndexStore};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write index cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize index cache {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to remove index cache {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;
