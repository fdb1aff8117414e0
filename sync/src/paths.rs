//! Forward-slash path utilities shared by the local and remote sides
//!
//! All paths handled by the engine are forward-slash strings, either absolute
//! or relative to a declared base. Windows separators are normalized away on
//! entry so the same comparisons work for both trees.

use crate::error::{Result, SyncError};

/// Replace any backslash separator with `/`. Idempotent.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Join `rel` onto `base` with a single `/`.
///
/// An absolute `rel` replaces `base` entirely, mirroring standard path-join
/// semantics.
pub fn join(base: &str, rel: &str) -> String {
    let rel = normalize(rel);
    if rel.starts_with('/') {
        return rel;
    }
    let base = normalize(base);
    if rel.is_empty() || rel == "." {
        return base;
    }
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        // base was "" or "/"
        if base.starts_with('/') {
            format!("/{rel}")
        } else {
            rel
        }
    } else {
        format!("{trimmed}/{rel}")
    }
}

/// Parent of `path`, or `None` if it has no parent.
///
/// `parent("/a/b") == Some("/a")`, `parent("/a") == Some("/")`. The root and
/// a bare relative component have no parent.
pub fn parent(path: &str) -> Option<String> {
    let p = normalize(path);
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(i) => Some(trimmed[..i].to_string()),
        None => None,
    }
}

/// Compute `path`'s position relative to `base`.
///
/// Both arguments must be of the same kind, absolute or relative; a mixed
/// pair cannot be related and fails with [`SyncError::PathRelation`]. Equal
/// paths yield `"."`; a path outside `base` comes back with leading `..`
/// components.
pub fn relative_to(path: &str, base: &str) -> Result<String> {
    let path = normalize(path);
    let base = normalize(base);
    if path.starts_with('/') != base.starts_with('/') {
        return Err(SyncError::path_relation(path, base));
    }

    let path_parts = components(&path);
    let base_parts = components(&base);
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = Vec::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    out.extend(&path_parts[common..]);

    if out.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(out.join("/"))
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect()
}
