//! Cluster-internal error codes for transactional group operations.

use serde::{Deserialize, Serialize};

/// Error codes for intra-cluster transactional group operations.
///
/// These travel between brokers, never to Kafka clients, so the vocabulary
/// can grow with conditions the public protocol cannot express. Keep it
/// disjoint from [`KafkaErrorCode`](super::KafkaErrorCode): a response type
/// carries exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxErrorCode {
    /// No error
    None,
    /// Unexpected server-side failure
    UnknownServerError,
    /// This broker/core is not the coordinator for the group
    NotCoordinator,
    /// No coordinator is available for the group
    CoordinatorNotAvailable,
    /// The coordinator is still loading group state from its log
    CoordinatorLoadInProgress,
    /// The operation did not complete within its deadline
    Timeout,
    /// The producer was fenced by a newer epoch
    Fenced,
    /// The producer's epoch is older than the coordinator's record
    StaleEpoch,
    /// The producer id/epoch pair is not valid for the group
    InvalidProducerEpoch,
    /// The transaction is not in a state that permits the operation
    InvalidTxnState,
    /// The group is rebalancing and cannot accept transactional writes
    RebalanceInProgress,
}

impl TxErrorCode {
    /// True when the code signals success.
    pub fn is_none(self) -> bool {
        self == TxErrorCode::None
    }
}
