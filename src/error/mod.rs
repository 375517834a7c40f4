//! Error types for the routing layer.
//!
//! Two separate vocabularies live here besides the crate [`Error`]:
//!
//! - [`KafkaErrorCode`]: the public Kafka protocol codes carried inside
//!   responses to client-facing group operations.
//! - [`TxErrorCode`]: the cluster-internal codes carried inside responses
//!   to transactional group operations.
//!
//! The router never mixes the two. Business failures (illegal generation,
//! unknown member, ...) are data inside a well-formed response; the crate
//! [`Error`] is reserved for failed signals: the cross-shard dispatch
//! itself failing, or a group manager failing a commit stage.

pub mod kafka_code;
pub mod tx_code;

pub use kafka_code::KafkaErrorCode;
pub use tx_code::TxErrorCode;

use crate::runtime::RuntimeError;
use thiserror::Error;

/// Failure of a routed operation's signal.
///
/// Cloneable so a commit-stage failure can be forwarded to the source
/// shard while the committed stage still observes the same value.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Cross-shard dispatch failed: the submission group was closed or the
    /// destination shard has shut down.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The owning shard's group manager failed against its offsets log.
    #[error("storage error: {0}")]
    Storage(String),

    /// Any other group manager failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for routing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Storage("log closed".to_string());
        assert_eq!(err.to_string(), "storage error: log closed");

        let err = Error::Runtime(RuntimeError::ShardNotFound { shard_id: 7 });
        assert_eq!(err.to_string(), "shard 7 not found");
    }

    #[test]
    fn test_error_clone_preserves_message() {
        let err = Error::Storage("log closed".to_string());
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
