//! Root sets: include/exclude roots matched by equality or ancestry
//!
//! A root covers itself and everything beneath it. Coverage is decided with a
//! relative-path test rather than string prefixes, so excluding `/a` does not
//! accidentally exclude `/ab`.

use crate::paths;

/// An ordered collection of normalized paths acting as subtree roots.
///
/// Insertion order does not affect the outcome of [`RootSet::covers`]; it is
/// kept only so traversal visits roots in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: Vec<String>,
}

impl RootSet {
    /// Create an empty root set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root. Duplicates are harmless and skipped.
    pub fn insert(&mut self, path: impl Into<String>) {
        let path = paths::normalize(&path.into());
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
    }

    /// Iterate the roots in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `candidate` equals any root or lies beneath one.
    ///
    /// For each root the candidate is related to it: a result of `"."` means
    /// the candidate is the root itself; a result that does not begin with a
    /// `..` component means it is a descendant. A root the candidate cannot
    /// be related to (absolute vs relative mismatch) simply does not cover it.
    pub fn covers(&self, candidate: &str) -> bool {
        for root in self.iter() {
            match paths::relative_to(candidate, root) {
                Ok(rel) => {
                    if rel == "." || rel.split('/').next() != Some("..") {
                        return true;
                    }
                }
                Err(_) => continue,
            }
        }
        false
    }
}

impl FromIterator<String> for RootSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for path in iter {
            set.insert(path);
        }
        set
    }
}
