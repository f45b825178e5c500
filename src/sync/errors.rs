//! Error types for the live-sync subsystem.

use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Live-sync errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// The streaming connection could not be opened
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The streaming connection dropped mid-stream
    #[error("Connection closed")]
    ConnectionClosed,

    /// An event payload could not be serialized for broadcast
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A full-list fetch failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
