use std::collections::HashMap;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use flexdeps_config::LayoutConfig;

use crate::{IndexError, InclusionIndex, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistence for one [`InclusionIndex`] per workspace.
///
/// A store never partially updates an index: `save` replaces it wholesale.
pub trait IndexStore {
    /// Returns `None` when nothing usable is stored.
    fn load(&self, workspace_root: &Path) -> Option<InclusionIndex>;

    fn save(&self, workspace_root: &Path, index: &InclusionIndex) -> Result<()>;

    /// Returns whether a stored index was removed.
    fn remove(&self, workspace_root: &Path) -> Result<bool>;
}

/// Stores the index as pretty-printed JSON in a file at the workspace root.
#[derive(Debug, Clone)]
pub struct JsonIndexStore {
    file_name: String,
}

impl JsonIndexStore {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn for_layout(layout: &LayoutConfig) -> Self {
        Self::new(layout.index_file.clone())
    }

    pub fn path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.file_name)
    }
}

impl IndexStore for JsonIndexStore {
    fn load(&self, workspace_root: &Path) -> Option<InclusionIndex> {
        let path = self.path(workspace_root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::debug!(
                    target = "flexdeps.index",
                    path = %path.display(),
                    error = %err,
                    "failed to read index cache"
                );
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(index) => Some(index),
            Err(err) => {
                tracing::info!(
                    target = "flexdeps.index",
                    path = %path.display(),
                    error = %err,
                    "index cache is unreadable; rebuilding"
                );
                None
            }
        }
    }

    fn save(&self, workspace_root: &Path, index: &InclusionIndex) -> Result<()> {
        let path = self.path(workspace_root);
        let mut bytes = serde_json::to_vec_pretty(index).map_err(|source| IndexError::Json {
            path: path.clone(),
            source,
        })?;
        bytes.push(b'\n');
        write_atomic(&path, &bytes).map_err(|source| IndexError::Write { path, source })
    }

    fn remove(&self, workspace_root: &Path) -> Result<bool> {
        let path = self.path(workspace_root);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(IndexError::Remove { path, source }),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    if let Err(err) = file.write_all(bytes).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    drop(file);

    if cfg!(windows) && path.exists() {
        // `rename` doesn't overwrite on Windows.
        let _ = fs::remove_file(path);
    }
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    #[cfg(unix)]
    {
        let _ = fs::File::open(parent).and_then(|dir| dir.sync_all());
    }

    Ok(())
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::Other, "destination path has no file name")
    })?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

/// In-memory store that counts how often it is written and cleared.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: Mutex<HashMap<PathBuf, InclusionIndex>>,
    saves: AtomicUsize,
    removes: AtomicUsize,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of `remove` calls so far, whether or not anything was stored.
    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, workspace_root: &Path) -> bool {
        self.indexes
            .lock()
            .map(|indexes| indexes.contains_key(workspace_root))
            .unwrap_or(false)
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self, workspace_root: &Path) -> Option<InclusionIndex> {
        self.indexes.lock().ok()?.get(workspace_root).cloned()
    }

    fn save(&self, workspace_root: &Path, index: &InclusionIndex) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut indexes) = self.indexes.lock() {
            indexes.insert(workspace_root.to_path_buf(), index.clone());
        }
        Ok(())
    }

    fn remove(&self, workspace_root: &Path) -> Result<bool> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .indexes
            .lock()
            .map(|mut indexes| indexes.remove(workspace_root).is_some())
            .unwrap_or(false))
    }
}
