//! Kafka protocol error codes surfaced on group coordinator responses.

use serde::{Deserialize, Serialize};

/// Kafka protocol error codes used on the coordinator surface.
///
/// Values match the wire codes of the Kafka protocol. This vocabulary is
/// public: it travels back to Kafka clients and can never be extended with
/// cluster-internal conditions (those use
/// [`TxErrorCode`](super::TxErrorCode)).
///
/// See: <https://kafka.apache.org/protocol.html#protocol_error_codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum KafkaErrorCode {
    /// Unexpected server-side failure
    UnknownServerError = -1,
    /// No error
    None = 0,
    /// The coordinator is still loading group state from its log
    CoordinatorLoadInProgress = 14,
    /// No coordinator is available for the group
    CoordinatorNotAvailable = 15,
    /// This broker/core is not the coordinator for the group
    NotCoordinator = 16,
    /// The member's generation does not match the group's
    IllegalGeneration = 22,
    /// The member's protocols are incompatible with the group's
    InconsistentGroupProtocol = 23,
    /// The group id is empty or malformed
    InvalidGroupId = 24,
    /// The member id is not known to the group
    UnknownMemberId = 25,
    /// The requested session timeout is outside the broker's bounds
    InvalidSessionTimeout = 26,
    /// The group is rebalancing; members must rejoin
    RebalanceInProgress = 27,
    /// Committed offset metadata exceeds the allowed size
    InvalidCommitOffsetSize = 28,
    /// The principal is not authorized for the group
    GroupAuthorizationFailed = 30,
    /// The group still has live members and cannot be deleted
    NonEmptyGroup = 68,
    /// The group exists but has no committed state
    GroupIdNotFound = 69,
    /// The group reached its configured member limit
    GroupMaxSizeReached = 81,
    /// A static member was fenced by a newer instance
    FencedInstanceId = 82,
}

impl KafkaErrorCode {
    /// Wire representation of the code.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// True when the code signals success.
    pub fn is_none(self) -> bool {
        self == KafkaErrorCode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(KafkaErrorCode::None.code(), 0);
        assert_eq!(KafkaErrorCode::NotCoordinator.code(), 16);
        assert_eq!(KafkaErrorCode::CoordinatorLoadInProgress.code(), 14);
        assert_eq!(KafkaErrorCode::UnknownServerError.code(), -1);
    }

    #[test]
    fn test_is_none() {
        assert!(KafkaErrorCode::None.is_none());
        assert!(!KafkaErrorCode::NotCoordinator.is_none());
    }
}
