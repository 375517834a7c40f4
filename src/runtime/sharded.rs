//! Sharded services: one instance per shard, explicit cross-shard calls.
//!
//! A [`Sharded<T>`] owns one thread per shard. Each thread builds its `T`
//! locally (the factory runs on the shard thread, so `T` does not need to
//! be `Send`), pins itself to its core, then serves tasks from a FIFO
//! channel on a single-threaded tokio runtime. Cross-shard callers never
//! touch `T` directly; they ship a closure to the owning shard and await
//! the result.

use super::affinity::set_affinity;
use super::config::ShardedConfig;
use super::smp::SmpServiceGroup;
use super::{set_current_shard, RuntimeError, RuntimeResult, ShardId};
use parking_lot::Mutex;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

type ShardTask<T> = Box<dyn FnOnce(Rc<T>) + Send>;

enum ShardMessage<T> {
    Task(ShardTask<T>),
    Shutdown,
}

/// A service with one instance per shard.
///
/// Instances are constructed on their own shard thread and never move.
/// Handles are cheaply cloneable and shareable across threads.
pub struct Sharded<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Sharded<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    senders: Vec<mpsc::UnboundedSender<ShardMessage<T>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: 'static> Sharded<T> {
    /// Spawn one shard thread per configured shard and construct the
    /// service instance on each via `factory`.
    pub fn start<F>(config: &ShardedConfig, factory: F) -> RuntimeResult<Self>
    where
        F: Fn(ShardId) -> T + Send + Sync + 'static,
    {
        config.validate().map_err(RuntimeError::ConfigError)?;

        let factory = Arc::new(factory);
        let mut senders = Vec::with_capacity(config.shard_count);
        let mut threads = Vec::with_capacity(config.shard_count);

        for shard_id in 0..config.shard_count {
            let (tx, rx) = mpsc::unbounded_channel();
            let core_id = config.core_for_shard(shard_id);
            let pin = config.pin_threads;
            let factory = Arc::clone(&factory);

            let handle = std::thread::Builder::new()
                .name(format!("shard-{shard_id}"))
                .stack_size(config.stack_size)
                .spawn(move || run_shard(shard_id, core_id, pin, factory, rx))
                .map_err(|e| RuntimeError::SpawnFailed(e.to_string()))?;

            senders.push(tx);
            threads.push(handle);
        }

        info!(shards = config.shard_count, "sharded service started");
        Ok(Self {
            inner: Arc::new(Inner {
                senders,
                threads: Mutex::new(threads),
            }),
        })
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.inner.senders.len()
    }

    /// Run `func` against the destination shard's instance and return its
    /// result.
    ///
    /// One permit from `ssg` is held for the full round trip; acquiring it
    /// is the suspension point that provides backpressure. The closure and
    /// everything it captures cross threads by move; the future it returns
    /// runs entirely on the destination shard.
    pub async fn invoke_on<F, Fut, R>(
        &self,
        shard: ShardId,
        ssg: &SmpServiceGroup,
        func: F,
    ) -> RuntimeResult<R>
    where
        F: FnOnce(Rc<T>) -> Fut + Send + 'static,
        Fut: Future<Output = R> + 'static,
        R: Send + 'static,
    {
        let _permit = ssg.acquire().await?;
        let (tx, rx) = oneshot::channel();

        self.send(
            shard,
            Box::new(move |service| {
                let fut = func(service);
                tokio::task::spawn_local(async move {
                    let _ = tx.send(fut.await);
                });
            }),
        )?;

        rx.await.map_err(|_| RuntimeError::CallDropped)
    }

    /// Fire-and-forget: run `func` on the destination shard's instance.
    ///
    /// Bypasses submission service groups; intended for small completion
    /// notifications. Delivery order from one sender to one destination is
    /// FIFO.
    pub fn submit_to<F>(&self, shard: ShardId, func: F) -> RuntimeResult<()>
    where
        F: FnOnce(Rc<T>) + Send + 'static,
    {
        self.send(shard, Box::new(func))
    }

    fn send(&self, shard: ShardId, task: ShardTask<T>) -> RuntimeResult<()> {
        let sender = self
            .inner
            .senders
            .get(shard)
            .ok_or(RuntimeError::ShardNotFound { shard_id: shard })?;
        sender
            .send(ShardMessage::Task(task))
            .map_err(|_| RuntimeError::ShardShutdown { shard_id: shard })
    }

    /// Deliver a shutdown message to every shard and join the threads.
    ///
    /// In-flight calls whose tasks have not yet run observe
    /// [`RuntimeError::CallDropped`]. Must not be called from a shard
    /// thread of this service.
    pub fn stop(&self) {
        for sender in &self.inner.senders {
            let _ = sender.send(ShardMessage::Shutdown);
        }
        let mut threads = self.inner.threads.lock();
        for handle in threads.drain(..) {
            if handle.join().is_err() {
                error!("shard thread panicked during shutdown");
            }
        }
        info!("sharded service stopped");
    }
}

fn run_shard<T, F>(
    shard_id: ShardId,
    core_id: usize,
    pin: bool,
    factory: Arc<F>,
    mut rx: mpsc::UnboundedReceiver<ShardMessage<T>>,
) where
    T: 'static,
    F: Fn(ShardId) -> T + Send + Sync + 'static,
{
    if pin {
        if let Err(e) = set_affinity(core_id) {
            warn!(shard_id, core_id, error = %e, "failed to pin shard thread");
        }
    }
    set_current_shard(shard_id);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(shard_id, error = %e, "failed to build shard runtime");
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        let service = Rc::new((*factory)(shard_id));
        debug!(shard_id, core_id, "shard service constructed");

        while let Some(message) = rx.recv().await {
            match message {
                ShardMessage::Task(task) => task(Rc::clone(&service)),
                ShardMessage::Shutdown => break,
            }
        }
    });

    debug!(shard_id, "shard thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::current_shard;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config(shards: usize) -> ShardedConfig {
        ShardedConfig {
            shard_count: shards,
            pin_threads: false,
            ..Default::default()
        }
    }

    struct Counter {
        shard: ShardId,
        hits: std::cell::Cell<u64>,
    }

    fn start_counters(shards: usize) -> Sharded<Counter> {
        Sharded::start(&test_config(shards), |shard| Counter {
            shard,
            hits: std::cell::Cell::new(0),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_on_returns_result() {
        let service = start_counters(2);
        let ssg = SmpServiceGroup::new("test", 4);

        let shard = service
            .invoke_on(1, &ssg, |counter| async move {
                counter.hits.set(counter.hits.get() + 1);
                counter.shard
            })
            .await
            .unwrap();

        assert_eq!(shard, 1);
        service.stop();
    }

    #[tokio::test]
    async fn test_invoke_runs_on_destination_thread() {
        let service = start_counters(3);
        let ssg = SmpServiceGroup::new("test", 4);

        let observed = service
            .invoke_on(2, &ssg, |_| async move { current_shard() })
            .await
            .unwrap();

        assert_eq!(observed, Some(2));
        service.stop();
    }

    #[tokio::test]
    async fn test_unknown_shard() {
        let service = start_counters(1);
        let ssg = SmpServiceGroup::new("test", 4);

        let err = service
            .invoke_on(9, &ssg, |_| async move {})
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ShardNotFound { shard_id: 9 }));
        service.stop();
    }

    #[tokio::test]
    async fn test_submit_to_fires() {
        let service = start_counters(1);
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let hits = Arc::clone(&hits);
            service
                .submit_to(0, move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        // Round-trip an invoke to flush the FIFO behind the submits.
        let ssg = SmpServiceGroup::new("test", 1);
        service.invoke_on(0, &ssg, |_| async {}).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 10);
        service.stop();
    }

    #[tokio::test]
    async fn test_instances_constructed_per_shard() {
        let built = Arc::new(AtomicUsize::new(0));
        let built_in_factory = Arc::clone(&built);
        let service = Sharded::start(&test_config(4), move |shard| {
            built_in_factory.fetch_add(1, Ordering::SeqCst);
            Counter {
                shard,
                hits: std::cell::Cell::new(0),
            }
        })
        .unwrap();

        let ssg = SmpServiceGroup::new("test", 4);
        for shard in 0..4 {
            let id = service
                .invoke_on(shard, &ssg, |c| async move { c.shard })
                .await
                .unwrap();
            assert_eq!(id, shard);
        }
        assert_eq!(built.load(Ordering::SeqCst), 4);
        service.stop();
    }

    #[tokio::test]
    async fn test_invoke_after_stop() {
        let service = start_counters(1);
        service.stop();

        let ssg = SmpServiceGroup::new("test", 1);
        let err = service
            .invoke_on(0, &ssg, |_| async move {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ShardShutdown { shard_id: 0 } | RuntimeError::CallDropped
        ));
    }
}
