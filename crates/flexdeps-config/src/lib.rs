//! Configuration for flexdeps: workspace layout conventions and logging.
//!
//! A workspace may carry a `flexdeps.toml` at its root. Every value has a
//! default, so an absent file is equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use thiserror::Error;

mod logging;

pub use logging::{init_tracing, LoggingConfig};

pub const FLEXDEPS_CONFIG_ENV_VAR: &str = "FLEXDEPS_CONFIG_PATH";

/// Separator used when collapsing non-alphanumeric runs in artifact names.
pub const ARTIFACT_NAME_SEPARATOR: char = '_';

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_owned())
    }
}

/// Naming conventions used to recognise projects, sources and artifacts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Name of the folder holding a project's sources.
    #[serde(default = "LayoutConfig::default_source_dir")]
    pub source_dir: String,

    /// Name of the folder holding a project's compiled artifacts.
    #[serde(default = "LayoutConfig::default_artifact_dir")]
    pub artifact_dir: String,

    #[serde(default = "LayoutConfig::default_library_extension")]
    pub library_extension: String,

    #[serde(default = "LayoutConfig::default_application_extension")]
    pub application_extension: String,

    /// Extension of general (script) source files.
    #[serde(default = "LayoutConfig::default_script_extension")]
    pub script_extension: String,

    /// Extension of markup source files, which may declare namespaces.
    #[serde(default = "LayoutConfig::default_markup_extension")]
    pub markup_extension: String,

    /// File name of the persisted inclusion index, relative to the workspace root.
    #[serde(default = "LayoutConfig::default_index_file")]
    pub index_file: String,

    /// File stems starting with this prefix are unit tests.
    #[serde(default = "LayoutConfig::default_test_prefix")]
    pub test_prefix: String,

    /// How many leading bytes of a markup file are searched for an application root tag.
    #[serde(default = "LayoutConfig::default_application_marker_window")]
    pub application_marker_window: usize,
}

impl LayoutConfig {
    fn default_source_dir() -> String {
        "src".to_owned()
    }

    fn default_artifact_dir() -> String {
        "bin".to_owned()
    }

    fn default_library_extension() -> String {
        "swc".to_owned()
    }

    fn default_application_extension() -> String {
        "swf".to_owned()
    }

    fn default_script_extension() -> String {
        "as".to_owned()
    }

    fn default_markup_extension() -> String {
        "mxml".to_owned()
    }

    fn default_index_file() -> String {
        ".flexdeps-index.json".to_owned()
    }

    fn default_test_prefix() -> String {
        "Test".to_owned()
    }

    fn default_application_marker_window() -> usize {
        2048
    }

    pub fn source_extensions(&self) -> [&str; 2] {
        [&self.script_extension, &self.markup_extension]
    }

    pub fn artifact_dir(&self, project: &Path) -> PathBuf {
        project.join(&self.artifact_dir)
    }

    /// Expected library archive of the project at `project`.
    pub fn library_artifact(&self, project: &Path) -> PathBuf {
        let dir_name = project
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.artifact_dir(project)
            .join(format!("{}.{}", artifact_name(&dir_name), self.library_extension))
    }

    /// Expected application package built from the entry file `entry`.
    pub fn application_artifact(&self, project: &Path, entry: &Path) -> PathBuf {
        let stem = entry
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.artifact_dir(project)
            .join(format!("{stem}.{}", self.application_extension))
    }

    /// Whether a file stem or simple class name denotes a unit test.
    pub fn is_test_name(&self, name: &str) -> bool {
        !self.test_prefix.is_empty() && name.starts_with(&self.test_prefix)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            source_dir: Self::default_source_dir(),
            artifact_dir: Self::default_artifact_dir(),
            library_extension: Self::default_library_extension(),
            application_extension: Self::default_application_extension(),
            script_extension: Self::default_script_extension(),
            markup_extension: Self::default_markup_extension(),
            index_file: Self::default_index_file(),
            test_prefix: Self::default_test_prefix(),
            application_marker_window: Self::default_application_marker_window(),
        }
    }
}

/// Derive an artifact base name from a project directory name.
///
/// The name is lower-cased and every run of non-alphanumeric characters is
/// collapsed into a single separator; leading and trailing separators are dropped.
pub fn artifact_name(dir_name: &str) -> String {
    let mut out = String::with_capacity(dir_name.len());
    let mut pending_separator = false;
    for ch in dir_name.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(ARTIFACT_NAME_SEPARATOR);
            }
            pending_separator = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlexdepsConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FlexdepsConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Discover the configuration file for a workspace root.
///
/// Search order:
/// 1) `FLEXDEPS_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `flexdeps.toml` in `workspace_root`
/// 3) `.flexdeps.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(FLEXDEPS_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path);
    }

    ["flexdeps.toml", ".flexdeps.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
}

/// Load the configuration for a workspace root.
///
/// If no config is present, returns [`FlexdepsConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(FlexdepsConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((FlexdepsConfig::default(), None));
    };

    let config = FlexdepsConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}
