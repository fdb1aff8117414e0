//! Expansion of include/exclude glob patterns into concrete root sets
//!
//! Upload-side patterns expand against the local filesystem, download-side
//! patterns against the remote tree. The asymmetry is deliberate: a remote
//! exclusion cannot be described in terms of local glob matches or vice
//! versa. Results are frozen into [`RootSet`]s of base-relative paths before
//! any traversal starts.

use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, SyncError};
use crate::paths;
use crate::roots::RootSet;
use crate::transport::Transport;

pub struct GlobExpander {
    transport: Arc<dyn Transport>,
}

impl GlobExpander {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Expand patterns against the local filesystem under `local_base`.
    ///
    /// Patterns are anchored at the base unless already absolute. A pattern
    /// with zero matches contributes nothing; a malformed pattern is an
    /// error. Matches that vanish between expansion and read are logged and
    /// dropped.
    pub fn expand_local(&self, patterns: &[String], local_base: &str) -> Result<RootSet> {
        let mut roots = RootSet::new();
        for pattern in patterns {
            let anchored = paths::join(local_base, pattern);
            let matches = glob::glob(&anchored)
                .map_err(|e| SyncError::pattern_error(pattern, e.to_string()))?;
            for entry in matches {
                match entry {
                    Ok(path) => {
                        let abs = paths::normalize(&path.to_string_lossy());
                        roots.insert(paths::relative_to(&abs, local_base)?);
                    }
                    Err(e) => warn!(pattern, error = %e, "unreadable glob match, skipping"),
                }
            }
        }
        Ok(roots)
    }

    /// Expand patterns against the remote tree under `remote_base`.
    ///
    /// The anchored pattern must be absolute; expansion goes through the
    /// transport's glob primitive and matches are stored relative to the
    /// remote base.
    pub async fn expand_remote(&self, patterns: &[String], remote_base: &str) -> Result<RootSet> {
        let mut roots = RootSet::new();
        for pattern in patterns {
            let anchored = paths::join(remote_base, pattern);
            if !anchored.starts_with('/') {
                return Err(SyncError::pattern_error(
                    pattern,
                    "remote patterns must resolve to an absolute path",
                ));
            }
            for matched in self.transport.list_by_glob(&anchored).await? {
                roots.insert(paths::relative_to(&matched, remote_base)?);
            }
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RemoteStat;
    use async_trait::async_trait;
    use std::path::Path;

    /// Transport stub for tests that never reach the remote side
    struct NoRemote;

    #[async_trait]
    impl Transport for NoRemote {
        async fn stat(&self, _path: &str) -> Result<Option<RemoteStat>> {
            unreachable!("local expansion must not touch the transport")
        }
        async fn list_dir(&self, _path: &str) -> Result<Vec<String>> {
            unreachable!()
        }
        async fn create_dir(&self, _path: &str) -> Result<()> {
            unreachable!()
        }
        async fn put_file(&self, _local: &Path, _remote: &str) -> Result<()> {
            unreachable!()
        }
        async fn get_file(&self, _remote: &str, _local: &Path) -> Result<()> {
            unreachable!()
        }
    }

    fn expander() -> GlobExpander {
        GlobExpander::new(Arc::new(NoRemote))
    }

    #[test]
    fn test_expand_local_star() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/y.txt"), b"y").unwrap();

        let base = paths::normalize(&dir.path().to_string_lossy());
        let roots = expander()
            .expand_local(&["*".to_string()], &base)
            .unwrap();

        let got: Vec<&str> = roots.iter().collect();
        assert!(got.contains(&"x.txt"));
        assert!(got.contains(&"sub"));
        assert!(!got.iter().any(|r| r.contains("y.txt")));
    }

    #[test]
    fn test_expand_local_no_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let base = paths::normalize(&dir.path().to_string_lossy());
        let roots = expander()
            .expand_local(&["*.nothing".to_string()], &base)
            .unwrap();
        assert!(roots.is_empty());
    }

    #[test]
    fn test_expand_local_bad_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let base = paths::normalize(&dir.path().to_string_lossy());
        let err = expander()
            .expand_local(&["[".to_string()], &base)
            .unwrap_err();
        assert!(matches!(err, SyncError::Pattern { .. }));
    }

    #[tokio::test]
    async fn test_expand_remote_requires_absolute() {
        let err = expander()
            .expand_remote(&["*.txt".to_string()], "relative/base")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Pattern { .. }));
    }
}
