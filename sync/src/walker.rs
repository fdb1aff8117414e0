//! Depth-first tree traversal with exclusion-aware pruning
//!
//! The walker visits one tree, local or remote, through the [`TreeSource`]
//! seam and hands every surviving file to a [`FileHandler`]. Exclusion roots
//! are tested before a directory is listed, so an excluded subtree costs no
//! stat or listing calls at all, which matters when the tree lives on the
//! other end of an SSH session.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::Result;
use crate::paths;
use crate::roots::RootSet;
use crate::transport::Transport;

/// Classification of a visited path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// Broken symlink, permission failure or special file; logged and skipped
    Unknown,
}

/// Read access to one file tree, local or remote
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Classify an absolute path within this tree
    async fn kind(&self, path: &str) -> Result<NodeKind>;

    /// List the child names of an absolute directory path
    async fn list_dir(&self, path: &str) -> Result<Vec<String>>;
}

/// Per-file callback invoked with base-relative paths
#[async_trait]
pub trait FileHandler: Send + Sync {
    async fn handle(&self, rel_path: &str) -> Result<()>;
}

/// The local filesystem as a [`TreeSource`]
pub struct LocalTree;

#[async_trait]
impl TreeSource for LocalTree {
    async fn kind(&self, path: &str) -> Result<NodeKind> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(NodeKind::Directory),
            Ok(meta) if meta.is_file() => Ok(NodeKind::File),
            Ok(_) => Ok(NodeKind::Unknown),
            Err(e) => {
                debug!(%path, error = %e, "local stat failed");
                Ok(NodeKind::Unknown)
            }
        }
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

/// A remote tree viewed through a [`Transport`]
pub struct RemoteTree {
    transport: Arc<dyn Transport>,
}

impl RemoteTree {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TreeSource for RemoteTree {
    async fn kind(&self, path: &str) -> Result<NodeKind> {
        match self.transport.stat(path).await? {
            Some(stat) if stat.is_dir => Ok(NodeKind::Directory),
            Some(_) => Ok(NodeKind::File),
            None => Ok(NodeKind::Unknown),
        }
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        self.transport.list_dir(path).await
    }
}

/// Depth-first walker over one tree.
///
/// `need` roots are base-relative include roots; `no_need` roots prune the
/// walk. A failure while handling one file, or while processing one root,
/// never aborts the rest of the pass. Sibling order is whatever the source's
/// listing returns.
pub struct TreeWalker<'a> {
    source: &'a dyn TreeSource,
    handler: &'a dyn FileHandler,
    base: &'a str,
    no_need: &'a RootSet,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        source: &'a dyn TreeSource,
        handler: &'a dyn FileHandler,
        base: &'a str,
        no_need: &'a RootSet,
    ) -> Self {
        Self {
            source,
            handler,
            base,
            no_need,
        }
    }

    /// Process every need root in order
    pub async fn run(&self, need: &RootSet) {
        for root in need.iter() {
            let abs = paths::join(self.base, root);
            if let Err(e) = self.visit_root(&abs).await {
                warn!(root, error = %e, "skipping root after failure");
            }
        }
    }

    async fn visit_root(&self, abs: &str) -> Result<()> {
        match self.source.kind(abs).await? {
            NodeKind::File => self.handle_file(abs).await,
            NodeKind::Directory => self.visit_dir(abs).await,
            NodeKind::Unknown => {
                warn!(path = abs, "ignoring entry that is neither file nor directory");
                Ok(())
            }
        }
    }

    fn visit_dir<'b>(&'b self, abs: &'b str) -> BoxFuture<'b, Result<()>> {
        Box::pin(async move {
            let rel = paths::relative_to(abs, self.base)?;
            if self.no_need.covers(&rel) {
                debug!(path = abs, "excluded directory, not descending");
                return Ok(());
            }
            for name in self.source.list_dir(abs).await? {
                let child = paths::join(abs, &name);
                let child_rel = paths::relative_to(&child, self.base)?;
                if self.no_need.covers(&child_rel) {
                    debug!(path = %child, "excluded, skipping");
                    continue;
                }
                match self.source.kind(&child).await? {
                    NodeKind::Directory => self.visit_dir(&child).await?,
                    NodeKind::File => self.handle_file(&child).await?,
                    NodeKind::Unknown => {
                        warn!(path = %child, "ignoring entry that is neither file nor directory");
                    }
                }
            }
            Ok(())
        })
    }

    /// Hand one file to the handler. Handler failures are logged and
    /// swallowed so the remaining siblings still get processed.
    async fn handle_file(&self, abs: &str) -> Result<()> {
        let rel = paths::relative_to(abs, self.base)?;
        if self.no_need.covers(&rel) {
            debug!(path = abs, "excluded, skipping");
            return Ok(());
        }
        if let Err(e) = self.handler.handle(&rel).await {
            warn!(path = abs, error = %e, "transfer failed, continuing with remaining files");
        }
        Ok(())
    }
}
