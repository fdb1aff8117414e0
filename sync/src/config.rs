//! Run configuration: connection details, bases and glob lists

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Name of the configuration file the CLI looks for in the working directory
pub const CONFIG_FILENAME: &str = "ftp.json";

/// Keys that must be present in a configuration file. `password` is the one
/// optional key; leaving it out (or empty) selects SSH key authentication.
const REQUIRED_KEYS: &[&str] = &[
    "host",
    "port",
    "username",
    "lazy",
    "localBase",
    "remoteBase",
    "upload",
    "noUpload",
    "download",
    "noDownload",
];

const TEMPLATE: &str = r#"{
    "host": "example.com",
    "port": 22,
    "username": "user",
    "password": "",
    "lazy": true,
    "localBase": ".",
    "remoteBase": "/home/user/project",
    "upload": ["*"],
    "noUpload": ["target", ".git"],
    "download": ["*"],
    "noDownload": []
}
"#;

/// Declarative description of one sync setup.
///
/// The four glob lists are expanded into root sets once at the start of a
/// run; the config itself is read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Empty means key-based authentication
    #[serde(default)]
    pub password: String,
    /// Skip files whose destination is not older than the source
    pub lazy: bool,
    #[serde(rename = "localBase")]
    pub local_base: String,
    #[serde(rename = "remoteBase")]
    pub remote_base: String,
    pub upload: Vec<String>,
    #[serde(rename = "noUpload")]
    pub no_upload: Vec<String>,
    pub download: Vec<String>,
    #[serde(rename = "noDownload")]
    pub no_download: Vec<String>,
}

impl SyncConfig {
    /// Read and validate a configuration file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SyncError::config_error(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse a configuration, reporting all missing required keys at once
    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| SyncError::config_error(format!("invalid JSON: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| SyncError::config_error("configuration must be a JSON object"))?;

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .filter(|key| !object.contains_key(**key))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::config_error(format!(
                "missing keys: {}",
                missing.join(", ")
            )));
        }

        serde_json::from_value(value).map_err(|e| SyncError::config_error(e.to_string()))
    }

    /// Write the template configuration for the `init` command.
    /// Refuses to clobber an existing file.
    pub async fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            return Err(SyncError::config_error(format!(
                "'{}' already exists, not overwriting",
                path.display()
            )));
        }
        tokio::fs::write(path, TEMPLATE).await?;
        Ok(())
    }
}
