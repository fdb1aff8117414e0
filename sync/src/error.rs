//! Error types for the sync engine library

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering every failure mode of a sync run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid configuration; fatal before any connection attempt
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection or login failure; fatal for the whole run
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A path cannot be expressed relative to its declared base
    #[error("path '{path}' is not relative to '{base}'")]
    PathRelation { path: String, base: String },

    /// Malformed glob pattern
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// A single file's transfer failed; the batch continues without it
    #[error("transfer failed for '{path}': {message}")]
    Transfer { path: String, message: String },

    /// Errors surfaced by the remote backend
    #[error("remote operation failed: {0}")]
    Remote(#[from] opendal::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new path relation error
    pub fn path_relation(path: impl Into<String>, base: impl Into<String>) -> Self {
        Self::PathRelation {
            path: path.into(),
            base: base.into(),
        }
    }

    /// Create a new pattern error
    pub fn pattern_error(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a new transfer error
    pub fn transfer_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transfer {
            path: path.into(),
            message: message.into(),
        }
    }
}
