//! Lexical discovery of class references in source files.
//!
//! This is pattern matching over raw text, not parsing. It over-matches
//! (lookalike tokens inside comments or string literals are reported) and
//! under-matches (references split across unusual formatting are missed).

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

use flexdeps_config::LayoutConfig;
use flexdeps_core::ClassReference;

/// Which extraction rules apply to a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// General source: imports and inline qualified names.
    Script,
    /// Markup: everything `Script` gets plus namespace declarations.
    Markup,
}

impl SourceKind {
    /// Classify a path by extension. Returns `None` for non-source files.
    pub fn for_path(path: &Path, layout: &LayoutConfig) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case(&layout.markup_extension) {
            Some(SourceKind::Markup)
        } else if ext.eq_ignore_ascii_case(&layout.script_extension) {
            Some(SourceKind::Script)
        } else {
            None
        }
    }
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bimport\s+([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*(?:\.\*)?)")
            .expect("valid regex")
    })
}

fn inline_qualified_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)+):([A-Za-z_$][\w$]*)")
            .expect("valid regex")
    })
}

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\bxmlns:[\w$-]+\s*=\s*["']([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*(?:\.\*)?)["']"#,
        )
        .expect("valid regex")
    })
}

/// Class references contained in one file's text, in discovery order and
/// without duplicates.
pub fn scan_source(text: &str, kind: SourceKind) -> Vec<ClassReference> {
    let mut found: IndexSet<String> = IndexSet::new();

    for caps in import_re().captures_iter(text) {
        found.insert(caps[1].to_owned());
    }

    // `a.b.C:D` names `a.b.C.D`.
    for caps in inline_qualified_re().captures_iter(text) {
        found.insert(format!("{}.{}", &caps[1], &caps[2]));
    }

    if kind == SourceKind::Markup {
        for caps in namespace_re().captures_iter(text) {
            found.insert(caps[1].to_owned());
        }
    }

    found.into_iter().map(ClassReference::from).collect()
}

/// Union of the class references of every source file below `root`, sorted.
///
/// Unreadable files are skipped with a warning.
pub fn list_class_imports(root: &Path, layout: &LayoutConfig) -> Vec<ClassReference> {
    let mut all: BTreeSet<ClassReference> = BTreeSet::new();
    let files = flexdeps_core::fs::collect_files_with_extensions(root, &layout.source_extensions());

    for file in files {
        let Some(kind) = SourceKind::for_path(&file, layout) else {
            continue;
        };
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(
                    target = "flexdeps.scan",
                    path = %file.display(),
                    error = %err,
                    "failed to read source file"
                );
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        all.extend(scan_source(&text, kind));
    }

    all.into_iter().collect()
}
