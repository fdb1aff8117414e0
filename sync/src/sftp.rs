//! SFTP transport backed by OpenDAL's `services-sftp` operator

use std::path::Path;

use async_trait::async_trait;
use opendal::{services::Sftp, Operator};
use tracing::info;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::transport::{RemoteStat, Transport};

/// One authenticated SFTP session, held for a whole push or pull pass
pub struct SftpTransport {
    op: Operator,
}

impl SftpTransport {
    /// Open and verify a session described by `config`.
    ///
    /// Authentication is key-based: the configured private key, or
    /// `~/.ssh/id_rsa` when none is given. The SFTP backend has no password
    /// surface, so a non-empty password is rejected up front rather than
    /// silently ignored.
    pub async fn connect(config: &SyncConfig) -> Result<Self> {
        if !config.password.is_empty() {
            return Err(SyncError::config_error(
                "password authentication is not supported; leave \"password\" empty to use an SSH key",
            ));
        }

        let key = dirs::home_dir()
            .map(|home| home.join(".ssh/id_rsa"))
            .ok_or_else(|| SyncError::config_error("cannot locate home directory for SSH key"))?;
        info!(key = %key.display(), "no password configured, using SSH key login");

        let endpoint = format!("ssh://{}:{}", config.host, config.port);
        let builder = Sftp::default()
            .endpoint(&endpoint)
            .user(&config.username)
            .key(&key.to_string_lossy())
            .root("/")
            .known_hosts_strategy("Accept");

        let op = Operator::new(builder)
            .map_err(|e| SyncError::Authentication(e.to_string()))?
            .finish();

        // Surface login failures now, before any traversal starts
        op.check()
            .await
            .map_err(|e| SyncError::Authentication(e.to_string()))?;

        Ok(Self { op })
    }

    /// Operator keys are relative to the root, without a leading slash
    fn key(path: &str) -> &str {
        path.trim_start_matches('/')
    }

    /// Directory keys must carry a trailing slash
    fn dir_key(path: &str) -> String {
        let key = Self::key(path);
        if key.is_empty() || key.ends_with('/') {
            key.to_string()
        } else {
            format!("{key}/")
        }
    }
}

#[async_trait]
impl Transport for SftpTransport {
    async fn stat(&self, path: &str) -> Result<Option<RemoteStat>> {
        match self.op.stat(Self::key(path)).await {
            Ok(meta) => Ok(Some(RemoteStat {
                mtime: meta.last_modified(),
                is_dir: meta.mode().is_dir(),
            })),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let entries = self.op.list(&Self::dir_key(path)).await?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.name().trim_end_matches('/').to_string())
            .filter(|name| !name.is_empty() && name != "." && name != "..")
            .collect())
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.op.create_dir(&Self::dir_key(path)).await?;
        Ok(())
    }

    async fn put_file(&self, local: &Path, remote: &str) -> Result<()> {
        let content = tokio::fs::read(local).await.map_err(|e| {
            SyncError::transfer_error(
                local.to_string_lossy(),
                format!("failed to read source: {e}"),
            )
        })?;
        self.op.write(Self::key(remote), content).await?;
        Ok(())
    }

    async fn get_file(&self, remote: &str, local: &Path) -> Result<()> {
        let content = self.op.read(Self::key(remote)).await?;
        tokio::fs::write(local, content.to_vec()).await.map_err(|e| {
            SyncError::transfer_error(
                local.to_string_lossy(),
                format!("failed to write destination: {e}"),
            )
        })?;
        Ok(())
    }
}
