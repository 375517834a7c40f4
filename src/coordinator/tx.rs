//! Cluster-internal transactional group operations.
//!
//! These requests arrive from the transaction coordinator on another
//! broker, not from Kafka clients, so their responses carry the
//! cluster-internal [`TxErrorCode`] vocabulary rather than public protocol
//! codes.

use super::requests::RoutedRequest;
use super::{GroupId, PartitionId};
use crate::error::TxErrorCode;

/// Producer id and epoch pair identifying a transactional producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerIdentity {
    pub id: i64,
    pub epoch: i16,
}

/// Internal transactional responses that can be synthesized from a failed
/// routing attempt.
pub trait TxErrorResponse<Req>: Sized {
    fn from_error(request: Req, error: TxErrorCode) -> Self;
}

macro_rules! impl_tx_routed_request {
    ($($ty:ty),+ $(,)?) => {
        $(impl RoutedRequest for $ty {
            fn group_id(&self) -> &GroupId {
                &self.group_id
            }

            fn set_coordinator_partition(&mut self, partition: PartitionId) {
                self.coordinator_partition = Some(partition);
            }
        })+
    };
}

#[derive(Debug, Clone)]
pub struct BeginGroupTxRequest {
    pub group_id: GroupId,
    pub pid: ProducerIdentity,
    pub tx_seq: i64,
    pub timeout_ms: i32,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct BeginGroupTxResponse {
    /// Coordinator term fencing later phases of the transaction.
    pub etag: i64,
    pub error: TxErrorCode,
}

impl TxErrorResponse<BeginGroupTxRequest> for BeginGroupTxResponse {
    fn from_error(_request: BeginGroupTxRequest, error: TxErrorCode) -> Self {
        Self { etag: -1, error }
    }
}

#[derive(Debug, Clone)]
pub struct PrepareGroupTxRequest {
    pub group_id: GroupId,
    pub pid: ProducerIdentity,
    pub tx_seq: i64,
    pub etag: i64,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct PrepareGroupTxResponse {
    pub error: TxErrorCode,
}

impl TxErrorResponse<PrepareGroupTxRequest> for PrepareGroupTxResponse {
    fn from_error(_request: PrepareGroupTxRequest, error: TxErrorCode) -> Self {
        Self { error }
    }
}

#[derive(Debug, Clone)]
pub struct CommitGroupTxRequest {
    pub group_id: GroupId,
    pub pid: ProducerIdentity,
    pub tx_seq: i64,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct CommitGroupTxResponse {
    pub error: TxErrorCode,
}

impl TxErrorResponse<CommitGroupTxRequest> for CommitGroupTxResponse {
    fn from_error(_request: CommitGroupTxRequest, error: TxErrorCode) -> Self {
        Self { error }
    }
}

#[derive(Debug, Clone)]
pub struct AbortGroupTxRequest {
    pub group_id: GroupId,
    pub pid: ProducerIdentity,
    pub tx_seq: i64,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct AbortGroupTxResponse {
    pub error: TxErrorCode,
}

impl TxErrorResponse<AbortGroupTxRequest> for AbortGroupTxResponse {
    fn from_error(_request: AbortGroupTxRequest, error: TxErrorCode) -> Self {
        Self { error }
    }
}

impl_tx_routed_request!(
    BeginGroupTxRequest,
    PrepareGroupTxRequest,
    CommitGroupTxRequest,
    AbortGroupTxRequest,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_error_carries_tx_code() {
        let request = BeginGroupTxRequest {
            group_id: GroupId::from("g"),
            pid: ProducerIdentity { id: 9, epoch: 0 },
            tx_seq: 1,
            timeout_ms: 30_000,
            coordinator_partition: None,
        };
        let response = BeginGroupTxResponse::from_error(request, TxErrorCode::NotCoordinator);
        assert_eq!(response.error, TxErrorCode::NotCoordinator);
        assert_eq!(response.etag, -1);
    }

    #[test]
    fn test_partition_slot_write() {
        let mut request = CommitGroupTxRequest {
            group_id: GroupId::from("g"),
            pid: ProducerIdentity { id: 9, epoch: 2 },
            tx_seq: 5,
            coordinator_partition: None,
        };
        request.set_coordinator_partition(PartitionId::offsets(3));
        assert_eq!(request.coordinator_partition, Some(PartitionId::offsets(3)));
    }
}
