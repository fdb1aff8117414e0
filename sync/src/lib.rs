//! Sync Engine Library
//!
//! Mirrors a local directory tree against a remote tree over SFTP:
//! - Include/exclude glob expansion into frozen root sets
//! - Exclusion-aware depth-first traversal of either tree
//! - Lazy transfers driven by modification-time comparison
//! - Push (local to remote) and pull (remote to local) passes

pub mod comparator;
pub mod config;
pub mod error;
pub mod globs;
pub mod paths;
pub mod roots;
pub mod sftp;
pub mod sync_engine;
pub mod transport;
pub mod walker;

// Re-export main types and functions
pub use comparator::{decide, Direction, TransferDecision};
pub use config::{SyncConfig, CONFIG_FILENAME};
pub use error::{Result, SyncError};
pub use globs::GlobExpander;
pub use roots::RootSet;
pub use sftp::SftpTransport;
pub use sync_engine::SyncEngine;
pub use transport::{RemoteStat, Transport};
pub use walker::{FileHandler, NodeKind, TreeSource, TreeWalker};

use std::sync::Arc;

/// Run one full push pass: expand the upload glob pair, mirror local files to
/// the remote tree, then release the session.
pub async fn push(config: &SyncConfig, transport: Arc<dyn Transport>) -> Result<()> {
    let expander = GlobExpander::new(Arc::clone(&transport));
    let upload = expander.expand_local(&config.upload, &config.local_base)?;
    let no_upload = expander.expand_local(&config.no_upload, &config.local_base)?;

    let engine = SyncEngine::from_config(config, Arc::clone(&transport));
    let result = engine.push(&upload, &no_upload).await;
    transport.close().await?;
    result
}

/// Run one full pull pass: expand the download glob pair, mirror remote files
/// to the local tree, then release the session.
pub async fn pull(config: &SyncConfig, transport: Arc<dyn Transport>) -> Result<()> {
    let expander = GlobExpander::new(Arc::clone(&transport));
    let download = expander
        .expand_remote(&config.download, &config.remote_base)
        .await?;
    let no_download = expander
        .expand_remote(&config.no_download, &config.remote_base)
        .await?;

    let engine = SyncEngine::from_config(config, Arc::clone(&transport));
    let result = engine.pull(&download, &no_download).await;
    transport.close().await?;
    result
}

// Test modules
#[cfg(test)]
pub mod integration_tests;
