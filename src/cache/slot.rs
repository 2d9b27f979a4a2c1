//! Single-flight cache slot.
//!
//! ```text
//! Empty ──get──▶ Pending ──task done──▶ Resolved(Ok | Err)
//!   ▲               │                        │
//!   └──invalidate───┴────────invalidate──────┘
//! ```
//!
//! A computation is spawned on the tokio runtime, so it always runs to
//! completion even if every caller stops waiting. Callers arriving while it is
//! pending share its outcome through a [`Shared`] future.
//!
//! Each slot carries a generation bumped by `invalidate()`. A computation that
//! completes after an invalidation still answers the callers already waiting on
//! it, but its result is not stored.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use super::ItemError;

pub type SlotResult<T> = Result<T, ItemError>;

type SharedResult<T> = Shared<BoxFuture<'static, SlotResult<T>>>;

enum State<T> {
    Empty,
    Pending(SharedResult<T>),
    Resolved(SlotResult<T>),
}

/// Observable state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Empty,
    Pending,
    Resolved,
    Failed,
}

struct Inner<T> {
    state: State<T>,
    generation: u64,
}

impl<T: Clone> Inner<T> {
    fn settle(&mut self, generation: u64, result: &SlotResult<T>) {
        if self.generation == generation && matches!(self.state, State::Pending(_)) {
            self.state = State::Resolved(result.clone());
        }
    }
}

pub struct Slot<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: State::Empty,
                generation: 0,
            })),
        }
    }
}

impl<T> Slot<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached outcome, join the pending computation, or start one.
    ///
    /// `compute` is called at most once per generation. `path` only labels
    /// the error if the spawned task dies.
    pub async fn get_or_compute<F, Fut>(&self, path: &Path, compute: F) -> SlotResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SlotResult<T>> + Send + 'static,
    {
        let pending = {
            let mut inner = self.inner.lock();
            let joined = match &inner.state {
                State::Resolved(result) => return result.clone(),
                State::Pending(shared) => Some(shared.clone()),
                State::Empty => None,
            };
            match joined {
                Some(shared) => shared,
                None => {
                    let shared = self.spawn(inner.generation, path, compute());
                    inner.state = State::Pending(shared.clone());
                    shared
                }
            }
        };
        pending.await
    }

    fn spawn<Fut>(&self, generation: u64, path: &Path, compute: Fut) -> SharedResult<T>
    where
        Fut: Future<Output = SlotResult<T>> + Send + 'static,
    {
        let cell = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = compute.await;
            cell.lock().settle(generation, &result);
            result
        });

        let cell = Arc::clone(&self.inner);
        let path = path.to_path_buf();
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    let result = Err(ItemError::Interrupted {
                        path,
                        message: e.to_string(),
                    });
                    cell.lock().settle(generation, &result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl<T> Slot<T> {
    /// Drop the cached outcome. A pending computation keeps running but its
    /// result will not be stored.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.state = State::Empty;
    }

    pub fn status(&self) -> SlotStatus {
        match &self.inner.lock().state {
            State::Empty => SlotStatus::Empty,
            State::Pending(_) => SlotStatus::Pending,
            State::Resolved(Ok(_)) => SlotStatus::Resolved,
            State::Resolved(Err(_)) => SlotStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    fn path() -> PathBuf {
        PathBuf::from("posts/2021-06-x/index.md")
    }

    async fn counted(calls: Arc<AtomicUsize>, value: u32) -> SlotResult<u32> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(value)
    }

    async fn explode() -> SlotResult<u32> {
        panic!("boom")
    }

    async fn wait_for(slot: &Slot<u32>, status: SlotStatus) {
        for _ in 0..200 {
            if slot.status() == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("slot never reached {status:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_computation() {
        let slot = Arc::new(Slot::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                slot.get_or_compute(&path(), || counted(calls, 7)).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.status(), SlotStatus::Resolved);
    }

    #[tokio::test]
    async fn test_resolved_value_is_reused() {
        let slot = Slot::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = slot.get_or_compute(&path(), || counted(calls, 1)).await;
            assert_eq!(value.unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_cached() {
        let slot = Slot::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let result = slot
                .get_or_compute(&path(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ItemError::NotFound(path()))
                })
                .await;
            assert!(result.unwrap_err().is_not_found());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.status(), SlotStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let slot = Slot::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = slot
            .get_or_compute(&path(), || counted(Arc::clone(&calls), 1))
            .await;
        slot.invalidate();
        assert_eq!(slot.status(), SlotStatus::Empty);
        let second = slot
            .get_or_compute(&path(), || counted(Arc::clone(&calls), 2))
            .await;

        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let slot = Slot::<u32>::new();
        slot.invalidate();
        slot.invalidate();
        assert_eq!(slot.status(), SlotStatus::Empty);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stale_result_not_stored() {
        let slot = Arc::new(Slot::<u32>::new());
        let gate = Arc::new(Notify::new());

        let waiter = {
            let slot = Arc::clone(&slot);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                slot.get_or_compute(&path(), || async move {
                    gate.notified().await;
                    Ok(1)
                })
                .await
            })
        };

        wait_for(&slot, SlotStatus::Pending).await;
        slot.invalidate();
        gate.notify_one();

        // The caller that was already waiting still gets its answer...
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
        // ...but the slot does not keep it.
        assert_eq!(slot.status(), SlotStatus::Empty);

        let fresh = slot.get_or_compute(&path(), || async { Ok(2) }).await;
        assert_eq!(fresh.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_computation_survives_dropped_caller() {
        let slot = Arc::new(Slot::<u32>::new());
        let gate = Arc::new(Notify::new());

        let caller = {
            let slot = Arc::clone(&slot);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                slot.get_or_compute(&path(), || async move {
                    gate.notified().await;
                    Ok(5)
                })
                .await
            })
        };

        wait_for(&slot, SlotStatus::Pending).await;
        caller.abort();
        gate.notify_one();

        wait_for(&slot, SlotStatus::Resolved).await;
        let value = slot
            .get_or_compute(&path(), || async { Err(ItemError::NotFound(path())) })
            .await;
        assert_eq!(value.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_panicking_computation_reports_interrupted() {
        let slot = Slot::<u32>::new();
        let result = slot.get_or_compute(&path(), explode).await;

        assert!(matches!(result, Err(ItemError::Interrupted { .. })));
        assert_eq!(slot.status(), SlotStatus::Failed);
    }
}
