//! Coordinator-layer request and response types for routed group
//! operations.
//!
//! These are the shapes the router and group manager exchange; the wire
//! codec maps Kafka protocol messages onto them at the protocol layer.
//! Every request carries a writable `coordinator_partition` slot that the
//! router populates before the cross-shard hop, and every response can be
//! synthesized from its request plus an error code so routing failures
//! produce well-formed replies without touching any group manager.

use super::{GroupId, PartitionId};
use crate::error::KafkaErrorCode;
use bytes::Bytes;

/// A request that can be routed to its group's coordinator shard.
pub trait RoutedRequest {
    /// Group the request addresses.
    fn group_id(&self) -> &GroupId;

    /// Record the coordinator partition resolved during routing. The
    /// router sets this before the request crosses shards.
    fn set_coordinator_partition(&mut self, partition: PartitionId);
}

/// Kafka-protocol responses that can be synthesized from a failed routing
/// attempt. Consumes the request so echoed fields move, not copy.
pub trait ErrorResponse<Req>: Sized {
    fn from_error(request: Req, error: KafkaErrorCode) -> Self;
}

macro_rules! impl_routed_request {
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

// ---------------------------------------------------------------------------
// JoinGroup

/// A protocol the joining member supports, with its subscription metadata.
#[derive(Debug, Clone)]
pub struct JoinGroupProtocol {
    pub name: String,
    pub metadata: Bytes,
}

#[derive(Debug, Clone)]
pub struct JoinGroupRequest {
    pub group_id: GroupId,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub protocol_type: String,
    pub protocols: Vec<JoinGroupProtocol>,
    pub session_timeout_ms: i32,
    pub rebalance_timeout_ms: i32,
    /// Coordinator partition, resolved by the router before dispatch.
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub metadata: Bytes,
}

#[derive(Debug, Clone)]
pub struct JoinGroupResponse {
    pub error: KafkaErrorCode,
    pub generation_id: i32,
    pub protocol_name: Option<String>,
    pub leader: String,
    pub member_id: String,
    /// Populated only for the elected leader.
    pub members: Vec<JoinGroupMember>,
}

impl ErrorResponse<JoinGroupRequest> for JoinGroupResponse {
    fn from_error(request: JoinGroupRequest, error: KafkaErrorCode) -> Self {
        Self {
            error,
            generation_id: -1,
            protocol_name: None,
            leader: String::new(),
            member_id: request.member_id,
            members: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncGroup

#[derive(Debug, Clone)]
pub struct SyncGroupAssignment {
    pub member_id: String,
    pub assignment: Bytes,
}

#[derive(Debug, Clone)]
pub struct SyncGroupRequest {
    pub group_id: GroupId,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub generation_id: i32,
    /// Non-empty only when sent by the group leader.
    pub assignments: Vec<SyncGroupAssignment>,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct SyncGroupResponse {
    pub error: KafkaErrorCode,
    pub assignment: Bytes,
}

impl ErrorResponse<SyncGroupRequest> for SyncGroupResponse {
    fn from_error(_request: SyncGroupRequest, error: KafkaErrorCode) -> Self {
        Self {
            error,
            assignment: Bytes::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Heartbeat

#[derive(Debug, Clone)]
pub struct HeartbeatRequest {
    pub group_id: GroupId,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub generation_id: i32,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatResponse {
    pub error: KafkaErrorCode,
}

impl ErrorResponse<HeartbeatRequest> for HeartbeatResponse {
    fn from_error(_request: HeartbeatRequest, error: KafkaErrorCode) -> Self {
        Self { error }
    }
}

// ---------------------------------------------------------------------------
// LeaveGroup

/// A member leaving the group, identified by member id and, for static
/// membership, instance id.
#[derive(Debug, Clone)]
pub struct MemberIdentity {
    pub member_id: String,
    pub group_instance_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeaveGroupRequest {
    pub group_id: GroupId,
    pub members: Vec<MemberIdentity>,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct LeaveGroupMemberResponse {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub error: KafkaErrorCode,
}

#[derive(Debug, Clone)]
pub struct LeaveGroupResponse {
    pub error: KafkaErrorCode,
    pub members: Vec<LeaveGroupMemberResponse>,
}

impl ErrorResponse<LeaveGroupRequest> for LeaveGroupResponse {
    fn from_error(request: LeaveGroupRequest, error: KafkaErrorCode) -> Self {
        let members = request
            .members
            .into_iter()
            .map(|member| LeaveGroupMemberResponse {
                member_id: member.member_id,
                group_instance_id: member.group_instance_id,
                error,
            })
            .collect();
        Self { error, members }
    }
}

// ---------------------------------------------------------------------------
// OffsetFetch

#[derive(Debug, Clone)]
pub struct OffsetFetchTopic {
    pub name: String,
    pub partitions: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchRequest {
    pub group_id: GroupId,
    /// `None` fetches all offsets committed by the group.
    pub topics: Option<Vec<OffsetFetchTopic>>,
    pub require_stable: bool,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchPartition {
    pub partition: i32,
    pub offset: i64,
    pub leader_epoch: i32,
    pub metadata: Option<String>,
    pub error: KafkaErrorCode,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchTopicResponse {
    pub name: String,
    pub partitions: Vec<OffsetFetchPartition>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchResponse {
    pub error: KafkaErrorCode,
    pub topics: Vec<OffsetFetchTopicResponse>,
}

impl ErrorResponse<OffsetFetchRequest> for OffsetFetchResponse {
    fn from_error(_request: OffsetFetchRequest, error: KafkaErrorCode) -> Self {
        Self {
            error,
            topics: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// OffsetCommit

#[derive(Debug, Clone)]
pub struct OffsetCommitPartition {
    pub partition: i32,
    pub offset: i64,
    pub leader_epoch: i32,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitRequest {
    pub group_id: GroupId,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub generation_id: i32,
    pub topics: Vec<OffsetCommitTopic>,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitPartitionResponse {
    pub partition: i32,
    pub error: KafkaErrorCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitTopicResponse {
    pub name: String,
    pub partitions: Vec<OffsetCommitPartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitResponse {
    pub topics: Vec<OffsetCommitTopicResponse>,
}

impl OffsetCommitResponse {
    /// True when every partition committed cleanly.
    pub fn all_committed(&self) -> bool {
        self.topics
            .iter()
            .all(|t| t.partitions.iter().all(|p| p.error.is_none()))
    }
}

// Offset commit responses mirror the request topology: the same error is
// reported for every partition the request named.
fn echo_commit_topology(
    topics: Vec<OffsetCommitTopic>,
    error: KafkaErrorCode,
) -> Vec<OffsetCommitTopicResponse> {
    topics
        .into_iter()
        .map(|topic| OffsetCommitTopicResponse {
            name: topic.name,
            partitions: topic
                .partitions
                .into_iter()
                .map(|p| OffsetCommitPartitionResponse {
                    partition: p.partition,
                    error,
                })
                .collect(),
        })
        .collect()
}

impl ErrorResponse<OffsetCommitRequest> for OffsetCommitResponse {
    fn from_error(request: OffsetCommitRequest, error: KafkaErrorCode) -> Self {
        Self {
            topics: echo_commit_topology(request.topics, error),
        }
    }
}

// ---------------------------------------------------------------------------
// TxnOffsetCommit
//
// Transactional offset commit is a Kafka-protocol operation (clients send
// it), so its responses use the public error vocabulary even though the
// commit participates in a transaction.

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitRequest {
    pub group_id: GroupId,
    pub transactional_id: String,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub member_id: String,
    pub generation_id: i32,
    pub topics: Vec<OffsetCommitTopic>,
    pub coordinator_partition: Option<PartitionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnOffsetCommitResponse {
    pub topics: Vec<OffsetCommitTopicResponse>,
}

impl ErrorResponse<TxnOffsetCommitRequest> for TxnOffsetCommitResponse {
    fn from_error(request: TxnOffsetCommitRequest, error: KafkaErrorCode) -> Self {
        Self {
            topics: echo_commit_topology(request.topics, error),
        }
    }
}

// ---------------------------------------------------------------------------
// DescribeGroups / ListGroups / DeleteGroups

#[derive(Debug, Clone)]
pub struct DescribedGroupMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub client_id: String,
    pub client_host: String,
    pub metadata: Bytes,
    pub assignment: Bytes,
}

#[derive(Debug, Clone)]
pub struct DescribedGroup {
    pub error: KafkaErrorCode,
    pub group_id: GroupId,
    pub state: String,
    pub protocol_type: String,
    pub protocol: String,
    pub members: Vec<DescribedGroupMember>,
}

impl DescribedGroup {
    /// A memberless description carrying only an error, for groups whose
    /// coordinator could not be reached.
    pub fn empty(group_id: GroupId, error: KafkaErrorCode) -> Self {
        Self {
            error,
            group_id,
            state: String::new(),
            protocol_type: String::new(),
            protocol: String::new(),
            members: Vec::new(),
        }
    }
}

/// One group in a ListGroups response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedGroup {
    pub group_id: GroupId,
    pub protocol_type: String,
    pub state: String,
}

/// Per-group outcome of a DeleteGroups request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletableGroupResult {
    pub group_id: GroupId,
    pub error: KafkaErrorCode,
}

impl_routed_request!(
    JoinGroupRequest,
    SyncGroupRequest,
    HeartbeatRequest,
    LeaveGroupRequest,
    OffsetFetchRequest,
    OffsetCommitRequest,
    TxnOffsetCommitRequest,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_request() -> OffsetCommitRequest {
        OffsetCommitRequest {
            group_id: GroupId::from("g"),
            member_id: "m-1".to_string(),
            group_instance_id: None,
            generation_id: 3,
            topics: vec![
                OffsetCommitTopic {
                    name: "orders".to_string(),
                    partitions: vec![
                        OffsetCommitPartition {
                            partition: 0,
                            offset: 10,
                            leader_epoch: -1,
                            metadata: None,
                        },
                        OffsetCommitPartition {
                            partition: 1,
                            offset: 20,
                            leader_epoch: -1,
                            metadata: None,
                        },
                    ],
                },
                OffsetCommitTopic {
                    name: "payments".to_string(),
                    partitions: vec![OffsetCommitPartition {
                        partition: 4,
                        offset: 7,
                        leader_epoch: -1,
                        metadata: None,
                    }],
                },
            ],
            coordinator_partition: None,
        }
    }

    #[test]
    fn test_partition_slot_write() {
        let mut request = commit_request();
        assert!(request.coordinator_partition.is_none());
        request.set_coordinator_partition(PartitionId::offsets(5));
        assert_eq!(request.coordinator_partition, Some(PartitionId::offsets(5)));
    }

    #[test]
    fn test_commit_error_echoes_topology() {
        let response =
            OffsetCommitResponse::from_error(commit_request(), KafkaErrorCode::NotCoordinator);
        assert_eq!(response.topics.len(), 2);
        assert_eq!(response.topics[0].partitions.len(), 2);
        assert_eq!(response.topics[1].partitions.len(), 1);
        for topic in &response.topics {
            for partition in &topic.partitions {
                assert_eq!(partition.error, KafkaErrorCode::NotCoordinator);
            }
        }
        assert!(!response.all_committed());
    }

    #[test]
    fn test_join_error_echoes_member_id() {
        let request = JoinGroupRequest {
            group_id: GroupId::from("g"),
            member_id: "m-7".to_string(),
            group_instance_id: None,
            protocol_type: "consumer".to_string(),
            protocols: Vec::new(),
            session_timeout_ms: 30_000,
            rebalance_timeout_ms: 60_000,
            coordinator_partition: None,
        };
        let response = JoinGroupResponse::from_error(request, KafkaErrorCode::NotCoordinator);
        assert_eq!(response.member_id, "m-7");
        assert_eq!(response.generation_id, -1);
        assert_eq!(response.error, KafkaErrorCode::NotCoordinator);
        assert!(response.members.is_empty());
    }

    #[test]
    fn test_leave_error_covers_all_members() {
        let request = LeaveGroupRequest {
            group_id: GroupId::from("g"),
            members: vec![
                MemberIdentity {
                    member_id: "a".to_string(),
                    group_instance_id: None,
                },
                MemberIdentity {
                    member_id: "b".to_string(),
                    group_instance_id: Some("static-b".to_string()),
                },
            ],
            coordinator_partition: None,
        };
        let response = LeaveGroupResponse::from_error(request, KafkaErrorCode::NotCoordinator);
        assert_eq!(response.members.len(), 2);
        assert!(response
            .members
            .iter()
            .all(|m| m.error == KafkaErrorCode::NotCoordinator));
    }
}
