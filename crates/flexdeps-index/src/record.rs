use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use flexdeps_core::ClassReference;

/// Which class set of a [`LibraryRecord`] a lookup consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClassField {
    #[default]
    Qualified,
    Unqualified,
}

/// One artifact (existing or still to be built) and the classes it provides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub artifact_path: PathBuf,
    /// Packaged classes. Never contains wildcards.
    #[serde(default)]
    pub qualified_classes: BTreeSet<ClassReference>,
    /// Classes declared without a package.
    #[serde(default)]
    pub unqualified_classes: BTreeSet<ClassReference>,
}

impl LibraryRecord {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            qualified_classes: BTreeSet::new(),
            unqualified_classes: BTreeSet::new(),
        }
    }

    /// Build a record from raw identifiers, routing each into the qualified or
    /// unqualified set depending on whether it carries a package.
    pub fn from_classes<I, S>(artifact_path: impl Into<PathBuf>, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ClassReference>,
    {
        let mut record = Self::new(artifact_path);
        for class in classes {
            let class = class.into();
            if class.is_wildcard() {
                continue;
            }
            if class.is_qualified() {
                record.qualified_classes.insert(class);
            } else {
                record.unqualified_classes.insert(class);
            }
        }
        record
    }

    pub fn classes(&self, field: ClassField) -> &BTreeSet<ClassReference> {
        match field {
            ClassField::Qualified => &self.qualified_classes,
            ClassField::Unqualified => &self.unqualified_classes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.qualified_classes.is_empty() && self.unqualified_classes.is_empty()
    }

    fn sort_key(&self) -> (usize, usize) {
        (self.qualified_classes.len(), self.unqualified_classes.len())
    }
}

/// Ordered list of [`LibraryRecord`]s for one workspace.
///
/// Records are kept ascending by `(qualified, unqualified)` class counts;
/// records with equal counts keep insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InclusionIndex {
    records: Vec<LibraryRecord>,
}

impl InclusionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `record` into the index.
    ///
    /// Empty records are dropped. A record for an artifact that is already
    /// indexed is unioned with the existing one and repositioned. Returns
    /// whether the index changed.
    pub fn insert(&mut self, mut record: LibraryRecord) -> bool {
        if record.is_empty() {
            return false;
        }

        if let Some(pos) = self
            .records
            .iter()
            .position(|existing| existing.artifact_path == record.artifact_path)
        {
            let existing = self.records.remove(pos);
            record.qualified_classes.extend(existing.qualified_classes);
            record.unqualified_classes.extend(existing.unqualified_classes);
        }

        let key = record.sort_key();
        let at = self.records.partition_point(|r| r.sort_key() <= key);
        self.records.insert(at, record);
        true
    }

    pub fn records(&self) -> &[LibraryRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &LibraryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, artifact_path: &Path) -> Option<&LibraryRecord> {
        self.records
            .iter()
            .find(|record| record.artifact_path == artifact_path)
    }
}

impl FromIterator<LibraryRecord> for InclusionIndex {
    fn from_iter<T: IntoIterator<Item = LibraryRecord>>(iter: T) -> Self {
        let mut index = InclusionIndex::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}
