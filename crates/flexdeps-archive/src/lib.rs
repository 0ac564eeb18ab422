//! Reading compiled-library archives.
//!
//! A library archive is a zip container with a `catalog.xml` manifest listing
//! every definition it provides. Exploded archives (a directory holding the
//! same entries) are read the same way.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use zip::ZipArchive;

/// Manifest entry listing the definitions of a library archive.
pub const CATALOG_ENTRY: &str = "catalog.xml";

/// Lists the class identifiers an archive declares.
///
/// Implementations never fail: any error degrades to an empty list.
pub trait ArchiveInspector {
    fn list_classes(&self, archive: &Path) -> Vec<String>;
}

impl<F> ArchiveInspector for F
where
    F: Fn(&Path) -> Vec<String>,
{
    fn list_classes(&self, archive: &Path) -> Vec<String> {
        self(archive)
    }
}

#[derive(Clone, Debug)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a file from the archive.
    ///
    /// Returns `Ok(None)` when the file isn't present.
    pub fn read(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        if self.path.is_dir() {
            let candidate = self.path.join(name);
            if !candidate.exists() {
                return Ok(None);
            }
            let mut buf = Vec::new();
            File::open(&candidate)
                .with_context(|| format!("failed to open {}", candidate.display()))?
                .read_to_end(&mut buf)
                .with_context(|| format!("failed to read {}", candidate.display()))?;
            return Ok(Some(buf));
        }

        let file = File::open(&self.path)
            .with_context(|| format!("failed to open archive {}", self.path.display()))?;
        let mut zip = ZipArchive::new(file)
            .with_context(|| format!("failed to read zip {}", self.path.display()))?;
        let result = match zip.by_name(name) {
            Ok(mut entry) => {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf).with_context(|| {
                    format!("failed to read {} from {}", name, self.path.display())
                })?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(err).with_context(|| {
                format!("failed to read {} from zip {}", name, self.path.display())
            }),
        };
        result
    }

    /// Class identifiers declared by the archive's catalog, in catalog order.
    pub fn catalog_classes(&self) -> anyhow::Result<Vec<String>> {
        let Some(bytes) = self.read(CATALOG_ENTRY)? else {
            anyhow::bail!("{} has no {CATALOG_ENTRY}", self.path.display());
        };
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{CATALOG_ENTRY} in {} is not utf-8", self.path.display()))?;
        parse_catalog(&text)
            .with_context(|| format!("failed to parse {CATALOG_ENTRY} in {}", self.path.display()))
    }
}

/// Extract definition ids from catalog XML.
///
/// Ids are written `pkg.sub:Name`; the colon is rewritten to a dot. Duplicate
/// ids keep their first position.
pub fn parse_catalog(text: &str) -> Result<Vec<String>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(text)?;
    let mut out: Vec<String> = Vec::new();
    for node in doc.descendants() {
        if !node.is_element() || node.tag_name().name() != "def" {
            continue;
        }
        let Some(id) = node.attribute("id") else {
            continue;
        };
        let id = id.trim().replace(':', ".");
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    Ok(out)
}

/// In-process [`ArchiveInspector`] reading `catalog.xml` from the archive.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwcCatalogInspector;

impl ArchiveInspector for SwcCatalogInspector {
    fn list_classes(&self, archive: &Path) -> Vec<String> {
        match Archive::new(archive).catalog_classes() {
            Ok(classes) => classes,
            Err(err) => {
                tracing::warn!(
                    target = "flexdeps.archive",
                    path = %archive.display(),
                    error = %format!("{err:#}"),
                    "failed to inspect archive; it contributes no classes"
                );
                Vec::new()
            }
        }
    }
}
