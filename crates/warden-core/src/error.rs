//! Error types for warden-core

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Core error type for warden operations
#[derive(Debug, Error)]
pub enum Error {
    /// Lock artifact could not be created, written, or removed
    #[error("lock artifact operation failed at {path}: {source}")]
    LockFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disablement artifact could not be read, written, or removed
    #[error("disablement artifact operation failed at {path}: {source}")]
    DisableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disablement artifact held malformed JSON
    #[error("malformed disablement artifact at {path}: {source}")]
    DisableFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file could not be read
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration precondition violated
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Child process for an isolated run could not be spawned or awaited
    #[error("isolated run failed: {reason}")]
    Isolation { reason: String },

    /// Work unit could not be constructed
    #[error("could not create run client: {reason}")]
    ClientInit { reason: String },

    /// Work unit failed while running
    #[error("run client failed: {reason}")]
    ClientRun { reason: String },

    /// The work unit exhausted memory. An isolated child reports this with
    /// the out-of-memory sentinel exit status; it is never contained.
    #[error("run client exhausted memory")]
    OutOfMemory,
}

/// Result type alias for warden-core operations
pub type Result<T> = std::result::Result<T, Error>;
