//! Error types for capmatrix

use thiserror::Error;

/// The main error type for capmatrix operations
#[derive(Error, Debug)]
pub enum MatrixError {
    /// LMDB failure
    #[error("storage error: {0}")]
    Storage(#[from] heed::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Node key not present in the menu tree
    #[error("unknown menu node: {0}")]
    UnknownNode(String),

    /// Capability flag name not recognised
    #[error("unknown capability flag: {0}")]
    UnknownFlag(String),

    #[error("no permission selected")]
    NoSelection,

    /// Operation not allowed in the session's current state
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("failed to fetch grants for permission {permission_id}: {reason}")]
    Fetch { permission_id: u64, reason: String },

    #[error("failed to save grants for permission {permission_id}: {reason}")]
    Save { permission_id: u64, reason: String },
}

/// Result type alias for capmatrix operations
pub type Result<T> = std::result::Result<T, MatrixError>;
