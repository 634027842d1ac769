use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the appwarden daemon
#[derive(Error, Debug)]
pub enum WardenError {
    /// Shutdown was requested (e.g., via Ctrl+C)
    #[error("shutdown requested")]
    ShutdownRequested,

    /// The blocklist file could not be read at startup
    #[error("failed to read blocklist {path}: {source}")]
    BlocklistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error reading or parsing configuration
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for appwarden operations
pub type Result<T> = std::result::Result<T, WardenError>;
