use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use flexdeps_core::ClassReference;
use flexdeps_index::{ClassField, InclusionIndex};

/// Two or more artifacts providing the same exact class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub class: ClassReference,
    /// Every candidate in index order; the first one was kept.
    pub candidates: Vec<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Matched artifacts, descending lexicographic order.
    pub artifacts: Vec<PathBuf>,
    pub collisions: Vec<Collision>,
}

/// Resolve `requested` classes to the artifacts that provide them.
///
/// Collisions are logged as warnings. See [`resolve_detailed`].
pub fn resolve<'r>(
    index: &InclusionIndex,
    requested: impl IntoIterator<Item = &'r ClassReference>,
    field: ClassField,
) -> Vec<PathBuf> {
    resolve_detailed(index, requested, field).artifacts
}

/// Like [`resolve`], also reporting name collisions.
///
/// Wildcards (`pkg.*`) match every record providing a class below `pkg` and
/// may legitimately match several artifacts. An exact class matching more
/// than one artifact keeps the first in index order. The result order is
/// deterministic but carries no build-order meaning.
pub fn resolve_detailed<'r>(
    index: &InclusionIndex,
    requested: impl IntoIterator<Item = &'r ClassReference>,
    field: ClassField,
) -> Resolution {
    let mut resolution = Resolution::default();
    if index.is_empty() {
        return resolution;
    }

    // Keyed by the string form so ordering is lexicographic on the whole path.
    let mut matched: BTreeMap<String, PathBuf> = BTreeMap::new();
    for class in requested {
        if let Some(package) = class.wildcard_package() {
            for record in index.iter() {
                if record
                    .classes(field)
                    .iter()
                    .any(|provided| provided.has_package_prefix(package))
                {
                    let path = &record.artifact_path;
                    matched.insert(path.to_string_lossy().into_owned(), path.clone());
                }
            }
            continue;
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        for record in index.iter() {
            if record.classes(field).contains(class.as_str())
                && !candidates.contains(&record.artifact_path)
            {
                candidates.push(record.artifact_path.clone());
            }
        }

        let Some(first) = candidates.first().cloned() else {
            continue;
        };
        if candidates.len() > 1 {
            let listed = candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                target = "flexdeps.build",
                class = %class,
                candidates = %listed,
                kept = %first.display(),
                "class is provided by more than one artifact"
            );
            resolution.collisions.push(Collision {
                class: class.clone(),
                candidates,
            });
        }
        matched.insert(first.to_string_lossy().into_owned(), first);
    }

    resolution.artifacts = matched.into_values().rev().collect();
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexdeps_index::LibraryRecord;

    fn refs(names: &[&str]) -> Vec<ClassReference> {
        names.iter().copied().map(ClassReference::from).collect()
    }

    fn index() -> InclusionIndex {
        [
            LibraryRecord::from_classes("/ws/Ui/bin/ui.swc", ["com.acme.ui.Button", "com.acme.ui.Label"]),
            LibraryRecord::from_classes("/ws/Net/bin/net.swc", ["com.acme.net.Client", "Loose"]),
            LibraryRecord::from_classes("/ws/Other/bin/other.swc", ["org.other.Thing"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn wildcard_matches_package_prefix() {
        let index = index();
        assert_eq!(
            resolve(&index, &refs(&["com.acme.*"]), ClassField::Qualified),
            vec![PathBuf::from("/ws/Ui/bin/ui.swc"), PathBuf::from("/ws/Net/bin/net.swc")]
        );
        assert!(resolve(&index, &refs(&["com.other.*"]), ClassField::Qualified).is_empty());
        assert!(resolve(&index, &refs(&["com.acm.*"]), ClassField::Qualified).is_empty());
    }

    #[test]
    fn exact_matches_are_literal() {
        let index = index();
        assert_eq!(
            resolve(&index, &refs(&["org.other.Thing", "org.other.Missing"]), ClassField::Qualified),
            vec![PathBuf::from("/ws/Other/bin/other.swc")]
        );
        assert!(resolve(&index, &refs(&["com.acme.ui"]), ClassField::Qualified).is_empty());
    }

    #[test]
    fn unqualified_field_is_separate() {
        let index = index();
        assert!(resolve(&index, &refs(&["Loose"]), ClassField::Qualified).is_empty());
        assert_eq!(
            resolve(&index, &refs(&["Loose"]), ClassField::Unqualified),
            vec![PathBuf::from("/ws/Net/bin/net.swc")]
        );
    }

    #[test]
    fn empty_inputs_resolve_to_nothing() {
        assert!(resolve(&InclusionIndex::new(), &refs(&["a.B"]), ClassField::Qualified).is_empty());
        assert!(resolve(&index(), &refs(&[]), ClassField::Qualified).is_empty());
    }

    #[test]
    fn collision_keeps_first_registered() {
        let index: InclusionIndex = [
            LibraryRecord::from_classes("/ws/Two/bin/two.swc", ["a.B"]),
            LibraryRecord::from_classes("/ws/One/bin/one.swc", ["a.B"]),
        ]
        .into_iter()
        .collect();

        let resolution = resolve_detailed(&index, &refs(&["a.B"]), ClassField::Qualified);
        assert_eq!(resolution.artifacts, vec![PathBuf::from("/ws/Two/bin/two.swc")]);
        assert_eq!(
            resolution.collisions,
            vec![Collision {
                class: ClassReference::from("a.B"),
                candidates: vec![
                    PathBuf::from("/ws/Two/bin/two.swc"),
                    PathBuf::from("/ws/One/bin/one.swc"),
                ],
            }]
        );
    }

    #[test]
    fn wildcard_spanning_artifacts_is_not_a_collision() {
        let index: InclusionIndex = [
            LibraryRecord::from_classes("/ws/A/bin/a.swc", ["pkg.A"]),
            LibraryRecord::from_classes("/ws/B/bin/b.swc", ["pkg.B"]),
        ]
        .into_iter()
        .collect();

        let resolution = resolve_detailed(&index, &refs(&["pkg.*"]), ClassField::Qualified);
        assert_eq!(
            resolution.artifacts,
            vec![PathBuf::from("/ws/B/bin/b.swc"), PathBuf::from("/ws/A/bin/a.swc")]
        );
        assert!(resolution.collisions.is_empty());
    }
}
