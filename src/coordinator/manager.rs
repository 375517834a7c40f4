//! Contract between the router and the per-shard group manager.

use super::requests::{
    DeletableGroupResult, DescribedGroup, HeartbeatRequest, HeartbeatResponse, JoinGroupRequest,
    JoinGroupResponse, LeaveGroupRequest, LeaveGroupResponse, ListedGroup, OffsetCommitRequest,
    OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse, SyncGroupRequest,
    SyncGroupResponse, TxnOffsetCommitRequest, TxnOffsetCommitResponse,
};
use super::tx::{
    AbortGroupTxRequest, AbortGroupTxResponse, BeginGroupTxRequest, BeginGroupTxResponse,
    CommitGroupTxRequest, CommitGroupTxResponse, PrepareGroupTxRequest, PrepareGroupTxResponse,
};
use super::{GroupId, PartitionId};
use crate::error::{KafkaErrorCode, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// The two completion moments of an offset commit.
///
/// `dispatched` resolves once the owning shard's manager has accepted the
/// commit and scheduled it for durable replication; `committed` resolves
/// when replication reached the required durability. Managers must resolve
/// `dispatched` strictly before `committed`; the router relies on that
/// ordering when forwarding both moments to the source shard.
///
/// A receiver whose sender was dropped means the layer producing that
/// stage failed before reaching it.
pub struct OffsetCommitStages {
    pub dispatched: oneshot::Receiver<Result<()>>,
    pub committed: oneshot::Receiver<Result<OffsetCommitResponse>>,
}

impl OffsetCommitStages {
    /// Build the stage pair together with its resolving ends.
    pub fn pending() -> (
        oneshot::Sender<Result<()>>,
        oneshot::Sender<Result<OffsetCommitResponse>>,
        Self,
    ) {
        let (dispatched_tx, dispatched) = oneshot::channel();
        let (committed_tx, committed) = oneshot::channel();
        (
            dispatched_tx,
            committed_tx,
            Self {
                dispatched,
                committed,
            },
        )
    }

    /// Both stages already complete, carrying `response`. Used when the
    /// commit never left the source shard.
    pub fn ready(response: OffsetCommitResponse) -> Self {
        let (dispatched_tx, committed_tx, stages) = Self::pending();
        let _ = dispatched_tx.send(Ok(()));
        let _ = committed_tx.send(Ok(response));
        stages
    }
}

/// Authoritative state for every group whose coordinator partition the
/// shard owns.
///
/// One instance per shard, constructed on its shard thread; methods run on
/// that thread only, so implementations need not be `Send`. Requests arrive
/// with the coordinator partition already resolved by the router.
#[async_trait(?Send)]
pub trait GroupManager: 'static {
    async fn join_group(&self, request: JoinGroupRequest) -> JoinGroupResponse;

    async fn sync_group(&self, request: SyncGroupRequest) -> SyncGroupResponse;

    async fn heartbeat(&self, request: HeartbeatRequest) -> HeartbeatResponse;

    async fn leave_group(&self, request: LeaveGroupRequest) -> LeaveGroupResponse;

    async fn offset_fetch(&self, request: OffsetFetchRequest) -> OffsetFetchResponse;

    /// Begin an offset commit, returning both completion stages. Must
    /// resolve `dispatched` before `committed`.
    fn offset_commit(&self, request: OffsetCommitRequest) -> OffsetCommitStages;

    async fn txn_offset_commit(&self, request: TxnOffsetCommitRequest) -> TxnOffsetCommitResponse;

    async fn begin_tx(&self, request: BeginGroupTxRequest) -> BeginGroupTxResponse;

    async fn prepare_tx(&self, request: PrepareGroupTxRequest) -> PrepareGroupTxResponse;

    async fn commit_tx(&self, request: CommitGroupTxRequest) -> CommitGroupTxResponse;

    async fn abort_tx(&self, request: AbortGroupTxRequest) -> AbortGroupTxResponse;

    /// Describe one group owned by `partition`.
    async fn describe_group(&self, partition: PartitionId, group: GroupId) -> DescribedGroup;

    /// Groups known to this shard, with a non-none error while the shard is
    /// still recovering group state from its log.
    async fn list_groups(&self) -> (KafkaErrorCode, Vec<ListedGroup>);

    /// Delete the given groups, all of which map to partitions this shard
    /// owns. Returns one result per input group.
    async fn delete_groups(
        &self,
        groups: Vec<(PartitionId, GroupId)>,
    ) -> Vec<DeletableGroupResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_stages_resolve_immediately() {
        let stages = OffsetCommitStages::ready(OffsetCommitResponse { topics: Vec::new() });

        let dispatched = stages.dispatched.await.unwrap();
        assert!(dispatched.is_ok());

        let committed = stages.committed.await.unwrap().unwrap();
        assert!(committed.topics.is_empty());
    }

    #[tokio::test]
    async fn test_pending_stage_forwarding() {
        let (dispatched_tx, committed_tx, stages) = OffsetCommitStages::pending();

        dispatched_tx.send(Ok(())).unwrap();
        assert!(stages.dispatched.await.unwrap().is_ok());

        committed_tx
            .send(Ok(OffsetCommitResponse { topics: Vec::new() }))
            .unwrap();
        assert!(stages.committed.await.unwrap().is_ok());
    }
}
