//! Error types for cache operations.
//!
//! Conflicts are deliberately absent from this enum: a transaction that loses
//! a race reports `Ok(false)` from `commit`, and a stale versioned write is a
//! silent no-op. Everything here is a genuine failure the caller must see.

use crate::transaction::{TransactionId, TransactionStatus};
use thiserror::Error;

/// All cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A value could not be encoded for storage
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored bytes could not be decoded back into a value
    #[error("failed to deserialize cached value for key {key}: {message}")]
    Deserialization {
        /// Store address of the offending entry
        key: String,
        /// Codec error message
        message: String,
    },

    /// The remote store failed or is unreachable
    #[error("remote cache error: {0}")]
    Remote(String),

    /// Operation is not defined for this cache flavour
    #[error("{operation} is not supported by versioned cache {cache}")]
    UnsupportedOperation {
        /// Operation name
        operation: &'static str,
        /// Cache name
        cache: String,
    },

    /// The transaction was already resolved
    #[error("transaction {id} is not active ({state})")]
    TransactionNotActive {
        /// Transaction id
        id: TransactionId,
        /// Terminal state it reached
        state: TransactionStatus,
    },

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A cache name was built twice from the same manager
    #[error("cache {0} has already been built")]
    DuplicateCache(String),

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Check if this error came from the remote backend.
    pub fn is_remote(&self) -> bool {
        matches!(self, CacheError::Remote(_))
    }

    /// Check if this is a codec failure in either direction.
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            CacheError::Serialization(_) | CacheError::Deserialization { .. }
        )
    }

    /// Check if this error signals API misuse rather than a runtime fault.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            CacheError::UnsupportedOperation { .. } | CacheError::TransactionNotActive { .. }
        )
    }

    pub(crate) fn unsupported(operation: &'static str, cache: impl Into<String>) -> Self {
        CacheError::UnsupportedOperation {
            operation,
            cache: cache.into(),
        }
    }
}

/// Shorthand used by versioned caches to reject `put_if_absent`/`evict_or_put`.
pub fn unsupported_on_versioned(operation: &'static str, cache: &str) -> CacheError {
    CacheError::unsupported(operation, cache)
}
