//! Transport capability set consumed by the sync engine
//!
//! Everything the engine needs from the remote side goes through this trait:
//! stat, directory listing, directory creation, file put/get and glob
//! expansion. The engine never talks to a concrete session type, so tests run
//! against an in-memory transport and production runs against SFTP.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use globset::Glob;

use crate::error::{Result, SyncError};
use crate::paths;

/// Metadata for a remote path
#[derive(Debug, Clone)]
pub struct RemoteStat {
    /// Last modification time, if the backend reports one
    pub mtime: Option<DateTime<Utc>>,
    /// Whether the path is a directory
    pub is_dir: bool,
}

/// Operations on one authenticated remote session.
///
/// The session is a single shared resource held for a whole push or pull pass
/// and released with [`Transport::close`] at the end.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stat a remote path. `Ok(None)` means the path does not exist; that is
    /// data for the lazy policy, not an error.
    async fn stat(&self, path: &str) -> Result<Option<RemoteStat>>;

    /// List the child names of a remote directory
    async fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    /// Create a remote directory. Creating one that already exists succeeds.
    async fn create_dir(&self, path: &str) -> Result<()>;

    /// Upload a local file to a remote path
    async fn put_file(&self, local: &Path, remote: &str) -> Result<()>;

    /// Download a remote file to a local path
    async fn get_file(&self, remote: &str, local: &Path) -> Result<()>;

    /// Expand an absolute glob pattern against the remote tree.
    ///
    /// Provided implementation: the pattern is walked component by component;
    /// literal components are checked with `stat`, glob components are
    /// matched against `list_dir` output. Zero matches yields an empty list.
    async fn list_by_glob(&self, pattern: &str) -> Result<Vec<String>> {
        expand_pattern(self, pattern).await
    }

    /// Release the session. Default is a no-op for connectionless backends.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn has_glob_chars(component: &str) -> bool {
    component.contains(|c| matches!(c, '*' | '?' | '[' | '{'))
}

fn expand_pattern<'a, T: Transport + ?Sized>(
    transport: &'a T,
    pattern: &'a str,
) -> BoxFuture<'a, Result<Vec<String>>> {
    Box::pin(async move {
        let pattern = paths::normalize(pattern);
        if !pattern.starts_with('/') {
            return Err(SyncError::pattern_error(
                pattern,
                "remote patterns must be absolute",
            ));
        }

        let mut current = vec!["/".to_string()];
        for component in pattern.split('/').filter(|c| !c.is_empty()) {
            let mut next = Vec::new();
            if has_glob_chars(component) {
                let matcher = Glob::new(component)
                    .map_err(|e| SyncError::pattern_error(&pattern, e.to_string()))?
                    .compile_matcher();
                for dir in &current {
                    match transport.stat(dir).await? {
                        Some(stat) if stat.is_dir => {}
                        _ => continue,
                    }
                    for name in transport.list_dir(dir).await? {
                        if matcher.is_match(&name) {
                            next.push(paths::join(dir, &name));
                        }
                    }
                }
            } else {
                for dir in &current {
                    let candidate = paths::join(dir, component);
                    if transport.stat(&candidate).await?.is_some() {
                        next.push(candidate);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        Ok(current)
    })
}
