use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;

use flexdeps_config::LayoutConfig;
use flexdeps_core::filter::{list_paths, to_slash, FilterToken, ListOptions, PathFilter};
use flexdeps_core::{fs, ClassReference};

/// What a project produces, decided once from its sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectKind {
    /// Produces one reusable library archive.
    Library { artifact: PathBuf },
    /// Produces an application package from its newest entry file.
    Application { entry: PathBuf, artifact: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub kind: ProjectKind,
}

impl Project {
    /// Locate the source root of `root` and classify the project.
    ///
    /// Returns `None` when no source root exists.
    pub fn open(root: &Path, layout: &LayoutConfig, quiet: bool) -> Option<Self> {
        let source_root = find_source_root(root, layout, quiet)?;
        Some(Self::classify(root, source_root, layout))
    }

    pub fn classify(root: &Path, source_root: PathBuf, layout: &LayoutConfig) -> Self {
        let kind = match application_entries(&source_root, layout).into_iter().next() {
            Some(entry) => ProjectKind::Application {
                artifact: layout.application_artifact(root, &entry),
                entry,
            },
            None => ProjectKind::Library {
                artifact: layout.library_artifact(root),
            },
        };
        Self {
            root: root.to_path_buf(),
            source_root,
            kind,
        }
    }

    /// The single artifact this project is expected to produce.
    pub fn artifact(&self) -> &Path {
        match &self.kind {
            ProjectKind::Library { artifact } | ProjectKind::Application { artifact, .. } => {
                artifact
            }
        }
    }

    pub fn is_application(&self) -> bool {
        matches!(self.kind, ProjectKind::Application { .. })
    }
}

/// Find the unique folder named for sources below `project`.
///
/// Candidates nested inside another candidate are ignored. When several
/// remain the shallowest (then lexically first) wins and a warning lists them
/// all, unless `quiet` is set.
pub fn find_source_root(project: &Path, layout: &LayoutConfig, quiet: bool) -> Option<PathBuf> {
    let filter = PathFilter::folders().with_token(FilterToken::ExcludeDotNames);
    let mut candidates: Vec<PathBuf> = list_paths(project, &filter, ListOptions::default())
        .into_iter()
        .filter(|dir| dir.file_name().is_some_and(|name| name == layout.source_dir.as_str()))
        .collect();
    candidates.sort_by(|a, b| {
        let depth = |p: &Path| p.components().count();
        depth(a).cmp(&depth(b)).then_with(|| a.cmp(b))
    });

    let mut roots: Vec<PathBuf> = Vec::new();
    for candidate in candidates {
        if roots.iter().any(|root| candidate.starts_with(root)) {
            continue;
        }
        roots.push(candidate);
    }

    if roots.len() > 1 {
        let listed = roots
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if quiet {
            tracing::debug!(
                target = "flexdeps.index",
                project = %project.display(),
                candidates = %listed,
                "multiple source roots"
            );
        } else {
            tracing::warn!(
                target = "flexdeps.index",
                project = %project.display(),
                candidates = %listed,
                "multiple source roots found; using the first"
            );
        }
    }

    roots.into_iter().next()
}

fn application_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<(?:[\w$-]+:)?(?:Windowed)?Application\b").expect("valid regex")
    })
}

fn has_application_marker(path: &Path, window: usize) -> bool {
    let mut head = Vec::with_capacity(window.min(64 * 1024));
    let read = File::open(path).and_then(|file| file.take(window as u64).read_to_end(&mut head));
    if let Err(err) = read {
        tracing::debug!(
            target = "flexdeps.index",
            path = %path.display(),
            error = %err,
            "failed to read markup file"
        );
        return false;
    }
    application_marker_re().is_match(&String::from_utf8_lossy(&head))
}

/// Markup files under `source_root` that declare an application root,
/// newest first. Unit-test entry points are excluded.
pub fn application_entries(source_root: &Path, layout: &LayoutConfig) -> Vec<PathBuf> {
    let mut entries: Vec<(SystemTime, PathBuf)> =
        fs::collect_files_with_extensions(source_root, &[layout.markup_extension.as_str()])
            .into_iter()
            .filter(|path| {
                let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
                !layout.is_test_name(&stem)
            })
            .filter(|path| has_application_marker(path, layout.application_marker_window))
            .map(|path| {
                let modified = fs::modified_time(&path).unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

    entries.sort_by(|(ta, pa), (tb, pb)| tb.cmp(ta).then_with(|| pa.cmp(pb)));
    entries.into_iter().map(|(_, path)| path).collect()
}

/// Classes a library project provides, derived from its source file paths.
///
/// Returns `(qualified, unqualified)`; unit-test classes are left out of both.
pub fn library_classes(
    source_root: &Path,
    layout: &LayoutConfig,
) -> (BTreeSet<ClassReference>, BTreeSet<ClassReference>) {
    let extensions = layout.source_extensions();
    let filter = PathFilter::files().with_token(FilterToken::ExcludeDotNames);
    let relative = ListOptions {
        relative: true,
        strip_extension: false,
    };

    let mut qualified = BTreeSet::new();
    let mut unqualified = BTreeSet::new();
    for path in list_paths(source_root, &filter, relative) {
        if !fs::has_extension(&path, &extensions) {
            continue;
        }
        let dotted = to_slash(&path.with_extension("")).replace('/', ".");
        let class = ClassReference::from(dotted);
        if layout.is_test_name(class.simple_name()) {
            continue;
        }
        if class.is_qualified() {
            qualified.insert(class);
        } else {
            unqualified.insert(class);
        }
    }
    (qualified, unqualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn warnings_during(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    const APP: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Application xmlns:fx="http://ns.adobe.com/mxml/2009" xmlns:s="library://ns.adobe.com/flex/spark">
</s:Application>"#;

    const VIEW: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Group xmlns:s="library://ns.adobe.com/flex/spark"/>"#;

    #[test]
    fn nested_source_folders_are_not_ambiguous() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src/com/src")).unwrap();
        std::fs::create_dir_all(tmp.path().join(".hidden/src")).unwrap();

        let root = find_source_root(tmp.path(), &LayoutConfig::default(), false).unwrap();
        assert_eq!(root, tmp.path().join("src"));
    }

    #[test]
    fn shallowest_source_root_wins() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("b/src")).unwrap();
        std::fs::create_dir_all(tmp.path().join("a/deeper/src")).unwrap();

        let root = find_source_root(tmp.path(), &LayoutConfig::default(), true).unwrap();
        assert_eq!(root, tmp.path().join("b/src"));
    }

    #[test]
    fn ambiguous_source_roots_warn_unless_quiet() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("b/src")).unwrap();
        std::fs::create_dir_all(tmp.path().join("a/src")).unwrap();
        let layout = LayoutConfig::default();

        let mut root = None;
        let loud = warnings_during(|| root = find_source_root(tmp.path(), &layout, false));
        assert_eq!(root, Some(tmp.path().join("a/src")));
        assert!(loud.contains("multiple source roots found"), "{loud}");
        assert!(loud.contains("b/src") || loud.contains("b\\src"), "{loud}");

        let silent = warnings_during(|| root = find_source_root(tmp.path(), &layout, true));
        assert_eq!(root, Some(tmp.path().join("a/src")));
        assert!(silent.is_empty(), "{silent}");
    }

    #[test]
    fn missing_source_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_source_root(tmp.path(), &LayoutConfig::default(), false), None);
    }

    #[test]
    fn application_entries_are_newest_first_and_skip_tests() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("Old.mxml"), APP).unwrap();
        std::fs::write(src.join("New.mxml"), APP).unwrap();
        std::fs::write(src.join("TestRunner.mxml"), APP).unwrap();
        std::fs::write(src.join("View.mxml"), VIEW).unwrap();
        set_file_mtime(src.join("Old.mxml"), FileTime::from_unix_time(1_000, 0)).unwrap();
        set_file_mtime(src.join("New.mxml"), FileTime::from_unix_time(2_000, 0)).unwrap();

        let entries = application_entries(&src, &LayoutConfig::default());
        assert_eq!(entries, vec![src.join("New.mxml"), src.join("Old.mxml")]);

        let project = Project::classify(tmp.path(), src, &LayoutConfig::default());
        assert!(project.is_application());
        assert_eq!(project.artifact(), tmp.path().join("bin/New.swf"));
    }

    #[test]
    fn marker_outside_window_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let padded = format!("<!--{}-->\n{APP}", " ".repeat(4096));
        std::fs::write(src.join("Late.mxml"), padded).unwrap();

        assert!(application_entries(&src, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn library_classes_partition_by_package() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("My Lib");
        let src = root.join("src");
        std::fs::create_dir_all(src.join("com/acme")).unwrap();
        std::fs::write(src.join("com/acme/Button.as"), "").unwrap();
        std::fs::write(src.join("com/acme/Skin.mxml"), VIEW).unwrap();
        std::fs::write(src.join("com/acme/TestButton.as"), "").unwrap();
        std::fs::write(src.join("com/acme/icon.png"), "").unwrap();
        std::fs::write(src.join("Loose.as"), "").unwrap();

        let layout = LayoutConfig::default();
        let (qualified, unqualified) = library_classes(&src, &layout);
        let qualified: Vec<_> = qualified.iter().map(ClassReference::as_str).collect();
        let unqualified: Vec<_> = unqualified.iter().map(ClassReference::as_str).collect();
        assert_eq!(qualified, vec!["com.acme.Button", "com.acme.Skin"]);
        assert_eq!(unqualified, vec!["Loose"]);

        let project = Project::classify(&root, src, &layout);
        assert_eq!(
            project.kind,
            ProjectKind::Library {
                artifact: root.join("bin/my_lib.swc")
            }
        );
    }
}
