use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A dotted qualified class name (`a.b.C`) or a package wildcard (`a.b.*`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassReference(String);

impl ClassReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0 == "*" || self.0.ends_with(".*")
    }

    /// The package named by a wildcard reference (`a.b.*` -> `a.b`).
    ///
    /// Returns `None` for exact references.
    pub fn wildcard_package(&self) -> Option<&str> {
        if self.0 == "*" {
            return Some("");
        }
        self.0.strip_suffix(".*")
    }

    /// Whether the reference carries a package (`a.B` does, `B` does not).
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.0.contains('.')
    }

    /// The last dotted segment (`a.b.C` -> `C`).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Segment-wise prefix test: `com.acme` is a prefix of `com.acme.ui.Button`
    /// but not of `com.acmelabs.Button`.
    pub fn has_package_prefix(&self, package: &str) -> bool {
        if package.is_empty() {
            return true;
        }
        self.0
            .strip_prefix(package)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ClassReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClassReference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ClassReference {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClassReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_package_strips_star() {
        let r = ClassReference::from("com.acme.*");
        assert!(r.is_wildcard());
        assert_eq!(r.wildcard_package(), Some("com.acme"));

        let exact = ClassReference::from("com.acme.Button");
        assert!(!exact.is_wildcard());
        assert_eq!(exact.wildcard_package(), None);
        assert_eq!(exact.simple_name(), "Button");
    }

    #[test]
    fn package_prefix_is_segment_aware() {
        let r = ClassReference::from("com.acme.ui.Button");
        assert!(r.has_package_prefix("com.acme"));
        assert!(r.has_package_prefix("com.acme.ui"));
        assert!(!r.has_package_prefix("com.acm"));
        assert!(!r.has_package_prefix("com.acme.ui.Button"));
        assert!(!ClassReference::from("com.acmelabs.X").has_package_prefix("com.acme"));
    }
}
