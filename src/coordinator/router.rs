//! Routes group operations to the shard that owns the group's coordinator
//! partition.

use super::manager::{GroupManager, OffsetCommitStages};
use super::mapper::CoordinatorMapper;
use super::requests::{
    DeletableGroupResult, DescribedGroup, ErrorResponse, HeartbeatRequest, HeartbeatResponse,
    JoinGroupRequest, JoinGroupResponse, LeaveGroupRequest, LeaveGroupResponse, ListedGroup,
    OffsetCommitRequest, OffsetCommitResponse, OffsetFetchRequest, OffsetFetchResponse,
    RoutedRequest, SyncGroupRequest, SyncGroupResponse, TxnOffsetCommitRequest,
    TxnOffsetCommitResponse,
};
use super::shard_table::ShardTable;
use super::tx::{
    AbortGroupTxRequest, AbortGroupTxResponse, BeginGroupTxRequest, BeginGroupTxResponse,
    CommitGroupTxRequest, CommitGroupTxResponse, PrepareGroupTxRequest, PrepareGroupTxResponse,
    TxErrorResponse,
};
use super::{GroupId, PartitionId};
use crate::error::{Error, KafkaErrorCode, Result, TxErrorCode};
use crate::metrics::{record_not_coordinator, record_routed_request};
use crate::runtime::{
    with_scheduling_group, RuntimeError, SchedulingGroup, ShardId, Sharded, SmpServiceGroup,
};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{trace, warn};

/// Forwards group operations to the owning shard.
///
/// Routing an operation is a two step lookup: the group id is mapped to its
/// coordinator partition, then the shard table yields the shard hosting
/// that partition's replica. The operation is invoked on the destination
/// shard's group manager inside the configured scheduling group, under the
/// configured submission service group.
///
/// The router holds no mutable state and performs no retries. When either
/// lookup fails it synthesizes a "not coordinator" reply without touching
/// any group manager; the caller is expected to rediscover the coordinator
/// and retry. One router is constructed per source shard.
pub struct GroupRouter<M: GroupManager> {
    shard: ShardId,
    sg: SchedulingGroup,
    ssg: SmpServiceGroup,
    group_manager: Sharded<M>,
    shards: Arc<ShardTable>,
    coordinators: Arc<CoordinatorMapper>,
}

impl<M: GroupManager> Clone for GroupRouter<M> {
    fn clone(&self) -> Self {
        Self {
            shard: self.shard,
            sg: self.sg.clone(),
            ssg: self.ssg.clone(),
            group_manager: self.group_manager.clone(),
            shards: Arc::clone(&self.shards),
            coordinators: Arc::clone(&self.coordinators),
        }
    }
}

impl<M: GroupManager> GroupRouter<M> {
    /// Wire up a router for source shard `shard`.
    pub fn new(
        shard: ShardId,
        sg: SchedulingGroup,
        ssg: SmpServiceGroup,
        group_manager: Sharded<M>,
        shards: Arc<ShardTable>,
        coordinators: Arc<CoordinatorMapper>,
    ) -> Self {
        Self {
            shard,
            sg,
            ssg,
            group_manager,
            shards,
            coordinators,
        }
    }

    /// Resolve the coordinator partition and owning shard for `group`.
    ///
    /// The decision is a snapshot: ownership may move between calls, and it
    /// is only honored for the duration of a single operation.
    pub fn shard_for(&self, group: &GroupId) -> Option<(PartitionId, ShardId)> {
        let partition = self.coordinators.partition_for(group)?;
        let shard = self.shards.shard_for(&partition)?;
        Some((partition, shard))
    }

    async fn route<Req, Resp, F, Fut>(
        &self,
        op: &'static str,
        mut request: Req,
        func: F,
    ) -> Result<Resp>
    where
        Req: RoutedRequest + Send + 'static,
        Resp: ErrorResponse<Req> + Send + 'static,
        F: FnOnce(Rc<M>, Req) -> Fut + Send + 'static,
        Fut: Future<Output = Resp> + 'static,
    {
        record_routed_request(op);
        let Some((partition, shard)) = self.shard_for(request.group_id()) else {
            trace!(op, group = %request.group_id(), "no coordinator mapping");
            record_not_coordinator(op);
            return Ok(Resp::from_error(request, KafkaErrorCode::NotCoordinator));
        };
        request.set_coordinator_partition(partition);
        let response = with_scheduling_group(
            &self.sg,
            self.group_manager
                .invoke_on(shard, &self.ssg, move |mgr| func(mgr, request)),
        )
        .await?;
        Ok(response)
    }

    // Same routing as `route`, but failures use the cluster-internal
    // transactional vocabulary: these operations travel between brokers,
    // and the public Kafka codes cannot be extended with internal
    // conditions.
    async fn route_tx<Req, Resp, F, Fut>(
        &self,
        op: &'static str,
        mut request: Req,
        func: F,
    ) -> Result<Resp>
    where
        Req: RoutedRequest + Send + 'static,
        Resp: TxErrorResponse<Req> + Send + 'static,
        F: FnOnce(Rc<M>, Req) -> Fut + Send + 'static,
        Fut: Future<Output = Resp> + 'static,
    {
        record_routed_request(op);
        let Some((partition, shard)) = self.shard_for(request.group_id()) else {
            trace!(op, group = %request.group_id(), "no coordinator mapping");
            record_not_coordinator(op);
            return Ok(Resp::from_error(request, TxErrorCode::NotCoordinator));
        };
        request.set_coordinator_partition(partition);
        let response = with_scheduling_group(
            &self.sg,
            self.group_manager
                .invoke_on(shard, &self.ssg, move |mgr| func(mgr, request)),
        )
        .await?;
        Ok(response)
    }

    pub async fn join_group(&self, request: JoinGroupRequest) -> Result<JoinGroupResponse> {
        self.route("join_group", request, |mgr, request| async move {
            mgr.join_group(request).await
        })
        .await
    }

    pub async fn sync_group(&self, request: SyncGroupRequest) -> Result<SyncGroupResponse> {
        self.route("sync_group", request, |mgr, request| async move {
            mgr.sync_group(request).await
        })
        .await
    }

    pub async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatResponse> {
        self.route("heartbeat", request, |mgr, request| async move {
            mgr.heartbeat(request).await
        })
        .await
    }

    pub async fn leave_group(&self, request: LeaveGroupRequest) -> Result<LeaveGroupResponse> {
        self.route("leave_group", request, |mgr, request| async move {
            mgr.leave_group(request).await
        })
        .await
    }

    pub async fn offset_fetch(&self, request: OffsetFetchRequest) -> Result<OffsetFetchResponse> {
        self.route("offset_fetch", request, |mgr, request| async move {
            mgr.offset_fetch(request).await
        })
        .await
    }

    pub async fn txn_offset_commit(
        &self,
        request: TxnOffsetCommitRequest,
    ) -> Result<TxnOffsetCommitResponse> {
        self.route("txn_offset_commit", request, |mgr, request| async move {
            mgr.txn_offset_commit(request).await
        })
        .await
    }

    pub async fn begin_tx(&self, request: BeginGroupTxRequest) -> Result<BeginGroupTxResponse> {
        trace!(
            group = %request.group_id,
            producer_id = request.pid.id,
            tx_seq = request.tx_seq,
            "routing begin_tx"
        );
        self.route_tx("begin_tx", request, |mgr, request| async move {
            mgr.begin_tx(request).await
        })
        .await
    }

    pub async fn prepare_tx(
        &self,
        request: PrepareGroupTxRequest,
    ) -> Result<PrepareGroupTxResponse> {
        trace!(
            group = %request.group_id,
            producer_id = request.pid.id,
            tx_seq = request.tx_seq,
            etag = request.etag,
            "routing prepare_tx"
        );
        self.route_tx("prepare_tx", request, |mgr, request| async move {
            mgr.prepare_tx(request).await
        })
        .await
    }

    pub async fn commit_tx(&self, request: CommitGroupTxRequest) -> Result<CommitGroupTxResponse> {
        trace!(
            group = %request.group_id,
            producer_id = request.pid.id,
            tx_seq = request.tx_seq,
            "routing commit_tx"
        );
        self.route_tx("commit_tx", request, |mgr, request| async move {
            mgr.commit_tx(request).await
        })
        .await
    }

    pub async fn abort_tx(&self, request: AbortGroupTxRequest) -> Result<AbortGroupTxResponse> {
        trace!(
            group = %request.group_id,
            producer_id = request.pid.id,
            tx_seq = request.tx_seq,
            "routing abort_tx"
        );
        self.route_tx("abort_tx", request, |mgr, request| async move {
            mgr.abort_tx(request).await
        })
        .await
    }

    /// Route an offset commit, exposing both completion stages.
    ///
    /// Both stages resolve on this router's shard. The destination forwards
    /// its dispatched completion first and the committed result second as
    /// one-way notifications onto the source shard's FIFO, so the
    /// dispatched stage never resolves after the committed one. A failure
    /// of the destination's dispatched stage is forwarded with the same
    /// error value.
    ///
    /// Must be called from within a tokio runtime.
    pub fn offset_commit(&self, mut request: OffsetCommitRequest) -> OffsetCommitStages {
        record_routed_request("offset_commit");
        let Some((partition, shard)) = self.shard_for(&request.group_id) else {
            trace!(group = %request.group_id, "no coordinator mapping");
            record_not_coordinator("offset_commit");
            return OffsetCommitStages::ready(OffsetCommitResponse::from_error(
                request,
                KafkaErrorCode::NotCoordinator,
            ));
        };
        request.set_coordinator_partition(partition);

        let (dispatched_tx, committed_tx, stages) = OffsetCommitStages::pending();

        let source = self.shard;
        let sg = self.sg.clone();
        let ssg = self.ssg.clone();
        let manager = self.group_manager.clone();
        let notifier = manager.clone();
        let completer = manager.clone();

        tokio::spawn(async move {
            let outcome = with_scheduling_group(
                &sg,
                manager.invoke_on(shard, &ssg, move |mgr| async move {
                    let stages = mgr.offset_commit(request);
                    // The manager resolves dispatched before committed, so
                    // forwarding the two in this order onto the source
                    // shard's FIFO preserves their relative order there.
                    let dispatched = match stages.dispatched.await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Runtime(RuntimeError::CallDropped)),
                    };
                    let _ = notifier.submit_to(source, move |_| {
                        let _ = dispatched_tx.send(dispatched);
                    });
                    match stages.committed.await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Runtime(RuntimeError::CallDropped)),
                    }
                }),
            )
            .await;

            let result = match outcome {
                Ok(result) => result,
                Err(e) => Err(Error::Runtime(e)),
            };
            let _ = completer.submit_to(source, move |_| {
                let _ = committed_tx.send(result);
            });
        });

        stages
    }

    /// Collect groups from every shard, with a non-none aggregate error
    /// when any shard was still loading group state.
    ///
    /// Partial lists are always merged; the aggregate error is the first
    /// non-none value encountered during reduction, which is not
    /// deterministic across runs.
    pub async fn list_groups(&self) -> Result<(KafkaErrorCode, Vec<ListedGroup>)> {
        record_routed_request("list_groups");
        let calls = (0..self.group_manager.shard_count()).map(|shard| {
            self.group_manager
                .invoke_on(shard, &self.ssg, |mgr| async move {
                    mgr.list_groups().await
                })
        });
        let partials = with_scheduling_group(&self.sg, join_all(calls)).await;

        let mut error = KafkaErrorCode::None;
        let mut groups = Vec::new();
        for partial in partials {
            let (shard_error, shard_groups) = partial?;
            if error.is_none() {
                error = shard_error;
            }
            groups.extend(shard_groups);
        }
        Ok((error, groups))
    }

    /// Describe one group on its owning shard.
    pub async fn describe_group(&self, group: GroupId) -> Result<DescribedGroup> {
        record_routed_request("describe_group");
        let Some((partition, shard)) = self.shard_for(&group) else {
            trace!(group = %group, "no coordinator mapping");
            record_not_coordinator("describe_group");
            return Ok(DescribedGroup::empty(group, KafkaErrorCode::NotCoordinator));
        };
        let described = with_scheduling_group(
            &self.sg,
            self.group_manager
                .invoke_on(shard, &self.ssg, move |mgr| async move {
                    mgr.describe_group(partition, group).await
                }),
        )
        .await?;
        Ok(described)
    }

    /// Describe several groups, one description per input, in input order.
    pub async fn describe_groups(&self, groups: Vec<GroupId>) -> Result<Vec<DescribedGroup>> {
        join_all(groups.into_iter().map(|group| self.describe_group(group)))
            .await
            .into_iter()
            .collect()
    }

    /// Delete groups, returning one result per input group.
    ///
    /// Inputs are bucketed by owning shard; groups with no routing decision
    /// are answered locally with "not coordinator" and never cross shards.
    /// Buckets are dispatched in parallel and a failure of one bucket does
    /// not affect the others. Treat the output as a bag keyed by group id:
    /// its order is not the input order.
    pub async fn delete_groups(&self, groups: Vec<GroupId>) -> Vec<DeletableGroupResult> {
        record_routed_request("delete_groups");
        let mut immediate = Vec::new();
        let mut buckets: HashMap<ShardId, Vec<(PartitionId, GroupId)>> = HashMap::new();
        for group in groups {
            match self.shard_for(&group) {
                Some((partition, shard)) => {
                    buckets.entry(shard).or_default().push((partition, group));
                }
                None => {
                    record_not_coordinator("delete_groups");
                    immediate.push(DeletableGroupResult {
                        group_id: group,
                        error: KafkaErrorCode::NotCoordinator,
                    });
                }
            }
        }

        // Appended to from each bucket's continuation; the mutex serializes
        // those appends.
        let results = Mutex::new(immediate);
        let calls = buckets.into_iter().map(|(shard, batch)| {
            let results = &results;
            let bucket_groups: Vec<GroupId> =
                batch.iter().map(|(_, group)| group.clone()).collect();
            async move {
                match self
                    .group_manager
                    .invoke_on(shard, &self.ssg, move |mgr| async move {
                        mgr.delete_groups(batch).await
                    })
                    .await
                {
                    Ok(mut deleted) => results.lock().append(&mut deleted),
                    Err(error) => {
                        // The shard is gone, so ownership of its
                        // partitions has necessarily moved; answer for
                        // exactly this bucket's groups.
                        warn!(shard, error = %error, "delete_groups dispatch failed");
                        let mut failed: Vec<DeletableGroupResult> = bucket_groups
                            .into_iter()
                            .map(|group_id| DeletableGroupResult {
                                group_id,
                                error: KafkaErrorCode::NotCoordinator,
                            })
                            .collect();
                        results.lock().append(&mut failed);
                    }
                }
            }
        });
        with_scheduling_group(&self.sg, join_all(calls)).await;
        results.into_inner()
    }

    /// Scheduling group routed work runs under.
    pub fn scheduling_group(&self) -> &SchedulingGroup {
        &self.sg
    }

    /// Submission service group bounding cross-shard calls.
    pub fn submission_group(&self) -> &SmpServiceGroup {
        &self.ssg
    }
}
