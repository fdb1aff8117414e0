//! Sync engine: one push or pull pass over the configured trees

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::comparator::{decide, Direction, TransferDecision};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::paths;
use crate::roots::RootSet;
use crate::transport::Transport;
use crate::walker::{FileHandler, LocalTree, RemoteTree, TreeWalker};

/// Drives one synchronization pass in either direction.
///
/// Traversal is sequential and transfers block one at a time; the transport
/// session is a single shared resource, so pushes and pulls are never
/// interleaved on one engine.
pub struct SyncEngine {
    transport: Arc<dyn Transport>,
    local_base: String,
    remote_base: String,
    lazy: bool,
}

impl SyncEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        local_base: impl Into<String>,
        remote_base: impl Into<String>,
        lazy: bool,
    ) -> Self {
        Self {
            transport,
            local_base: paths::normalize(&local_base.into()),
            remote_base: paths::normalize(&remote_base.into()),
            lazy,
        }
    }

    pub fn from_config(config: &SyncConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            transport,
            &config.local_base,
            &config.remote_base,
            config.lazy,
        )
    }

    /// One local-to-remote pass over the upload roots
    pub async fn push(&self, upload: &RootSet, no_upload: &RootSet) -> Result<()> {
        info!(
            local = %self.local_base,
            remote = %self.remote_base,
            roots = upload.len(),
            "starting push"
        );
        self.prepare_remote(&self.remote_base).await?;

        let source = LocalTree;
        let handler = UploadHandler { engine: self };
        let walker = TreeWalker::new(&source, &handler, &self.local_base, no_upload);
        walker.run(upload).await;
        Ok(())
    }

    /// One remote-to-local pass over the download roots
    pub async fn pull(&self, download: &RootSet, no_download: &RootSet) -> Result<()> {
        info!(
            local = %self.local_base,
            remote = %self.remote_base,
            roots = download.len(),
            "starting pull"
        );
        self.prepare_local(&self.local_base).await?;

        let source = RemoteTree::new(Arc::clone(&self.transport));
        let handler = DownloadHandler { engine: self };
        let walker = TreeWalker::new(&source, &handler, &self.remote_base, no_download);
        walker.run(download).await;
        Ok(())
    }

    /// Ensure the remote directory chain up to `path` exists.
    ///
    /// Walks upward collecting missing ancestors until an existing directory
    /// is found, then creates downward. A directory appearing concurrently is
    /// fine; an existing non-directory at any level is not.
    pub async fn prepare_remote(&self, path: &str) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = paths::normalize(path);
        loop {
            match self.transport.stat(&current).await? {
                Some(stat) if stat.is_dir => break,
                Some(_) => {
                    return Err(SyncError::transfer_error(
                        &current,
                        "remote path exists but is not a directory",
                    ))
                }
                None => {
                    missing.push(current.clone());
                    match paths::parent(&current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
        }
        for dir in missing.iter().rev() {
            debug!(dir, "creating remote directory");
            self.transport.create_dir(dir).await?;
        }
        Ok(())
    }

    /// Local counterpart of [`SyncEngine::prepare_remote`]
    pub async fn prepare_local(&self, path: &str) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = paths::normalize(path);
        loop {
            match tokio::fs::metadata(&current).await {
                Ok(meta) if meta.is_dir() => break,
                Ok(_) => {
                    return Err(SyncError::transfer_error(
                        &current,
                        "local path exists but is not a directory",
                    ))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    missing.push(current.clone());
                    match paths::parent(&current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        for dir in missing.iter().rev() {
            debug!(dir, "creating local directory");
            match tokio::fs::create_dir(dir).await {
                Ok(()) => {}
                // raced with concurrent creation
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Transfer one base-relative file to the remote side
    pub async fn upload_one(&self, rel: &str) -> Result<()> {
        let local = paths::join(&self.local_base, rel);
        let remote = paths::join(&self.remote_base, rel);
        debug!(%local, %remote, "uploading");

        // a source that cannot be statted is a caller error, not a skip
        let meta = tokio::fs::metadata(&local).await.map_err(|e| {
            SyncError::transfer_error(&local, format!("failed to stat source: {e}"))
        })?;

        let decision = if self.lazy {
            let source_mtime = DateTime::<Utc>::from(meta.modified()?);
            let dest_mtime = self.transport.stat(&remote).await?.and_then(|s| s.mtime);
            decide(true, Direction::Upload, source_mtime, dest_mtime)
        } else {
            TransferDecision::Transfer
        };
        if decision == TransferDecision::Skip {
            info!(%local, "unchanged, not uploading");
            return Ok(());
        }

        if let Some(parent) = paths::parent(&remote) {
            self.prepare_remote(&parent).await?;
        }
        self.transport.put_file(Path::new(&local), &remote).await?;
        info!(%local, "uploaded");
        Ok(())
    }

    /// Transfer one base-relative file to the local side
    pub async fn download_one(&self, rel: &str) -> Result<()> {
        let local = paths::join(&self.local_base, rel);
        let remote = paths::join(&self.remote_base, rel);
        debug!(%remote, %local, "downloading");

        let decision = if self.lazy {
            let source = self.transport.stat(&remote).await?.ok_or_else(|| {
                SyncError::transfer_error(&remote, "source missing on remote")
            })?;
            let dest_mtime = match tokio::fs::metadata(&local).await {
                Ok(meta) => Some(DateTime::<Utc>::from(meta.modified()?)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            match source.mtime {
                Some(source_mtime) => {
                    decide(true, Direction::Download, source_mtime, dest_mtime)
                }
                // backend reports no mtime, nothing to compare against
                None => TransferDecision::Transfer,
            }
        } else {
            TransferDecision::Transfer
        };
        if decision == TransferDecision::Skip {
            info!(%local, "unchanged, not downloading");
            return Ok(());
        }

        if let Some(parent) = paths::parent(&local) {
            self.prepare_local(&parent).await?;
        }
        self.transport.get_file(&remote, Path::new(&local)).await?;
        info!(%local, "downloaded");
        Ok(())
    }
}

struct UploadHandler<'a> {
    engine: &'a SyncEngine,
}

#[async_trait]
impl FileHandler for UploadHandler<'_> {
    async fn handle(&self, rel_path: &str) -> Result<()> {
        self.engine.upload_one(rel_path).await
    }
}

struct DownloadHandler<'a> {
    engine: &'a SyncEngine,
}

#[async_trait]
impl FileHandler for DownloadHandler<'_> {
    async fn handle(&self, rel_path: &str) -> Result<()> {
        self.engine.download_one(rel_path).await
    }
}
