//! # Error Taxonomy
//!
//! Centralizes every failure mode the core can surface across its public
//! operations: malformed paths, missing/occupied targets, adapter I/O
//! failures, cryptographic tamper/corruption, cancellation, and the
//! "could not fully repair" case that a failed move can leave behind.

pub type CoreResult<T> = Result<T, CoreError>;

/// Every failure mode a public operation can return, per the error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("folder not empty: {0}")]
    NotEmpty(String),

    #[error("storage adapter I/O error: {0}")]
    Io(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("corrupted record or blob layout: {0}")]
    Corruption(String),

    #[error("operation aborted: {0}")]
    Aborted(String),

    #[error("invariant could not be fully repaired: {0}")]
    Correctable(String),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Corruption(format!("record JSON malformed: {e}"))
    }
}
