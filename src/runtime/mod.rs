//! Thread-per-core runtime primitives for sharded services.
//!
//! Each shard is an OS thread pinned to a CPU core, running a
//! single-threaded task loop. Objects live on exactly one shard and are
//! never touched from another; all cross-shard communication is an explicit
//! asynchronous call whose continuation runs on the destination shard.
//!
//! The pieces:
//!
//! - [`Sharded<T>`]: a service with one instance per shard, constructed on
//!   its own thread. Cross-shard access goes through
//!   [`Sharded::invoke_on`] (request/response) or [`Sharded::submit_to`]
//!   (fire-and-forget).
//! - [`SmpServiceGroup`]: bounds the number of concurrent in-flight
//!   cross-shard calls. The routing layer's only source of backpressure.
//! - [`SchedulingGroup`]: a named CPU-accounting and preemption class under
//!   which routed work executes.

pub mod affinity;
pub mod config;
pub mod scheduling;
pub mod sharded;
pub mod smp;

pub use affinity::{available_cpus, set_affinity};
pub use config::ShardedConfig;
pub use scheduling::{with_scheduling_group, SchedulingGroup, SchedulingGroupStats};
pub use sharded::Sharded;
pub use smp::{SmpServiceGroup, SmpServiceGroupStats};

use std::cell::Cell;
use thiserror::Error;

/// Identifier of an execution shard. Dense in `[0, shard_count)` and stable
/// for the process lifetime.
pub type ShardId = usize;

/// Errors from the sharded runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("failed to spawn shard thread: {0}")]
    SpawnFailed(String),

    #[error("shard {shard_id} not found")]
    ShardNotFound { shard_id: ShardId },

    #[error("shard {shard_id} has shut down")]
    ShardShutdown { shard_id: ShardId },

    #[error("cross-shard call dropped before completing")]
    CallDropped,

    #[error("submission service group closed")]
    SubmissionClosed,

    #[error("CPU affinity error: {0}")]
    AffinityError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

thread_local! {
    static CURRENT_SHARD: Cell<Option<ShardId>> = const { Cell::new(None) };
}

/// Shard id of the calling thread, if it is a shard thread.
pub fn current_shard() -> Option<ShardId> {
    CURRENT_SHARD.with(|cell| cell.get())
}

pub(crate) fn set_current_shard(shard_id: ShardId) {
    CURRENT_SHARD.with(|cell| cell.set(Some(shard_id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_shard_unset_off_shard() {
        assert_eq!(current_shard(), None);
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::ShardShutdown { shard_id: 3 };
        assert_eq!(err.to_string(), "shard 3 has shut down");
    }
}
