#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![warn(clippy::expect_used)]

//! # Shardline
//!
//! Sharded group-coordinator routing for thread-per-core Kafka-compatible
//! brokers.
//!
//! A broker running one execution shard per CPU core keeps each consumer
//! group's coordinator state on exactly one shard: the shard owning the
//! group's partition of the internal offsets topic. This crate provides the
//! routing layer that sits between protocol handlers and that per-shard
//! group manager:
//!
//! ```text
//!  protocol handler (any shard)
//!          │
//!          ▼
//!    GroupRouter ── CoordinatorMapper ─▶ group id → offsets partition
//!          │        ShardTable        ─▶ partition → owning shard
//!          ▼
//!    cross-shard call (scheduling group + submission service group)
//!          │
//!          ▼
//!    GroupManager on the owning shard
//! ```
//!
//! The router is stateless: it caches nothing, retries nothing, and when
//! the mapping is not locally resolvable it answers with a well-formed
//! "not coordinator" response so the client re-runs coordinator discovery.
//!
//! ## Modules
//!
//! - [`runtime`]: thread-per-core primitives — [`runtime::Sharded`]
//!   services, [`runtime::SmpServiceGroup`] bounded cross-shard submission,
//!   [`runtime::SchedulingGroup`] CPU accounting
//! - [`coordinator`]: the router, its collaborator contracts, and the
//!   request/response types of every routed operation
//! - [`error`]: crate errors plus the two coordinator error vocabularies
//! - [`metrics`]: feature-gated routing counters
//!
//! ## Example
//!
//! ```rust,ignore
//! use shardline::runtime::{SchedulingGroup, Sharded, ShardedConfig, SmpServiceGroup};
//! use shardline::{CoordinatorMapper, GroupRouter, ShardTable};
//! use std::sync::Arc;
//!
//! let managers = Sharded::start(&ShardedConfig::default(), |shard| {
//!     MyGroupManager::new(shard)
//! })?;
//!
//! let router = GroupRouter::new(
//!     /* source shard */ 0,
//!     SchedulingGroup::new("kafka-groups"),
//!     SmpServiceGroup::new("kafka-groups", 512),
//!     managers,
//!     Arc::new(ShardTable::new()),
//!     Arc::new(CoordinatorMapper::new()),
//! );
//!
//! let response = router.heartbeat(request).await?;
//! ```

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod runtime;

pub use coordinator::{
    CoordinatorMapper, GroupId, GroupManager, GroupRouter, OffsetCommitStages, PartitionId,
    ShardTable,
};
pub use error::{Error, KafkaErrorCode, Result, TxErrorCode};
