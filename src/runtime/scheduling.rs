//! Scheduling groups: CPU accounting and preemption classes.
//!
//! A [`SchedulingGroup`] names a class of work so operators can see where
//! shard time goes and so no single class can monopolize a shard's task
//! loop. Wrapping a future with [`with_scheduling_group`] attributes its
//! wall time to the group; entering the group is itself a potential
//! suspension point, as the task periodically defers to the local scheduler
//! on entry.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Default number of entries between forced yields.
const DEFAULT_YIELD_INTERVAL: u64 = 64;

/// A named CPU-accounting and preemption class.
///
/// Cheaply cloneable; clones share the same counters.
#[derive(Clone)]
pub struct SchedulingGroup {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    yield_interval: u64,
    tasks_entered: AtomicU64,
    attributed_nanos: AtomicU64,
}

impl SchedulingGroup {
    /// Create a group with the default yield interval.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_yield_interval(name, DEFAULT_YIELD_INTERVAL)
    }

    /// Create a group that defers to the scheduler every `yield_interval`
    /// entries.
    pub fn with_yield_interval(name: impl Into<String>, yield_interval: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                yield_interval: yield_interval.max(1),
                tasks_entered: AtomicU64::new(0),
                attributed_nanos: AtomicU64::new(0),
            }),
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of tasks that entered the group.
    pub fn tasks_entered(&self) -> u64 {
        self.inner.tasks_entered.load(Ordering::Relaxed)
    }

    /// Snapshot of the group's counters.
    pub fn stats(&self) -> SchedulingGroupStats {
        SchedulingGroupStats {
            name: self.inner.name.clone(),
            tasks_entered: self.inner.tasks_entered.load(Ordering::Relaxed),
            attributed_nanos: self.inner.attributed_nanos.load(Ordering::Relaxed),
        }
    }

    // Returns true when this entry should defer to the scheduler.
    fn enter(&self) -> bool {
        let entries = self.inner.tasks_entered.fetch_add(1, Ordering::Relaxed) + 1;
        entries % self.inner.yield_interval == 0
    }

    fn account(&self, started: Instant) {
        self.inner
            .attributed_nanos
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for SchedulingGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingGroup")
            .field("name", &self.inner.name)
            .field("tasks_entered", &self.tasks_entered())
            .finish()
    }
}

/// Serializable snapshot of a scheduling group's counters.
///
/// `attributed_nanos` is wall time of the wrapped futures, including time
/// suspended on cross-shard calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingGroupStats {
    pub name: String,
    pub tasks_entered: u64,
    pub attributed_nanos: u64,
}

/// Run `fut` inside `sg`.
///
/// Entry is a potential suspension point: every `yield_interval`-th entry
/// defers to the local scheduler once before polling the future.
pub async fn with_scheduling_group<F>(sg: &SchedulingGroup, fut: F) -> F::Output
where
    F: Future,
{
    if sg.enter() {
        tokio::task::yield_now().await;
    }
    let started = Instant::now();
    let output = fut.await;
    sg.account(started);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_output_through() {
        let sg = SchedulingGroup::new("test");
        let out = with_scheduling_group(&sg, async { 41 + 1 }).await;
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_counts_entries() {
        let sg = SchedulingGroup::new("test");
        for _ in 0..5 {
            with_scheduling_group(&sg, async {}).await;
        }
        assert_eq!(sg.tasks_entered(), 5);
        assert_eq!(sg.stats().tasks_entered, 5);
    }

    #[tokio::test]
    async fn test_yield_interval_still_completes() {
        let sg = SchedulingGroup::with_yield_interval("test", 1);
        // Every entry yields; results must still come back.
        for i in 0..3u32 {
            let out = with_scheduling_group(&sg, async move { i * 2 }).await;
            assert_eq!(out, i * 2);
        }
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let sg = SchedulingGroup::new("shared");
        let clone = sg.clone();
        with_scheduling_group(&clone, async {}).await;
        assert_eq!(sg.tasks_entered(), 1);
    }
}
