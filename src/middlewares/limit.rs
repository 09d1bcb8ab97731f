//! Concurrency limiting.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::result::TaskResult;
use crate::task::{Property, Task};

/// An async lock the limiter can release and re-acquire out of scope order,
/// which RAII guards cannot express.
#[async_trait]
pub trait Lock: Send + Sync {
    /// Block until a hold on the lock is obtained.
    async fn acquire(&self);
    /// Give up one hold on the lock.
    fn release(&self);
}

/// A [`Lock`] that admits up to `permits` concurrent holders.
///
/// `SemaphoreLock::new(1)` serializes the tasks it guards.
pub struct SemaphoreLock {
    semaphore: Semaphore,
}

impl SemaphoreLock {
    /// A lock admitting `permits` concurrent holders.
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Semaphore::new(permits),
        }
    }
}

#[async_trait]
impl Lock for SemaphoreLock {
    async fn acquire(&self) {
        self.semaphore
            .acquire()
            .await
            .expect("limiter semaphore is never closed")
            .forget();
    }

    fn release(&self) {
        self.semaphore.add_permits(1);
    }
}

#[derive(Clone)]
struct TaskLock(Arc<dyn Lock>);

/// Give one task its own lock, honored by [`ConcurrencyLimiter::per_task`].
pub fn with_lock(lock: Arc<dyn Lock>) -> Property {
    Box::new(move |task: &Task| {
        task.modify_property(move |_: Option<TaskLock>| TaskLock(lock));
    })
}

#[derive(Clone, Copy)]
struct DependDepth(u32);

/// Limits how many tasks of a set run at once.
///
/// The limiter holds the lock for the duration of each task's run, but
/// releases it while the task is blocked inside a `depend` call and
/// re-acquires it when the dependency resolves. Without that release, a task
/// waiting on a sibling would hold a permit the sibling needs, deadlocking
/// the set whenever the dependency graph is deeper than the permit count.
/// Nested `depend` calls are depth-counted through the task's property bag so
/// only the outermost one releases.
pub struct ConcurrencyLimiter {
    lock: Option<Arc<dyn Lock>>,
}

impl ConcurrencyLimiter {
    /// Limit every task in the set with one shared `lock`.
    pub fn new(lock: Arc<dyn Lock>) -> Self {
        Self { lock: Some(lock) }
    }

    /// Limit only the tasks that carry their own lock via [`with_lock`];
    /// tasks without one run unrestricted.
    pub fn per_task() -> Self {
        Self { lock: None }
    }

    fn lock_for(&self, task: &Task) -> Option<Arc<dyn Lock>> {
        self.lock
            .clone()
            .or_else(|| task.property::<TaskLock>().map(|TaskLock(lock)| lock))
    }
}

struct ReleaseOnDrop<'a>(&'a dyn Lock);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[async_trait]
impl Middleware for ConcurrencyLimiter {
    async fn run(&self, ctx: Context, task: Task, next: Next) -> TaskResult {
        task.modify_property(|_: Option<DependDepth>| DependDepth(0));

        match self.lock_for(&task) {
            None => next.run(ctx).await,
            Some(lock) => {
                lock.acquire().await;
                let _held = ReleaseOnDrop(&*lock);
                next.run(ctx).await
            }
        }
    }

    async fn depend(&self, ctx: Context, task: Task, _dependency: Task, next: Next) -> TaskResult {
        let Some(lock) = self.lock_for(&task) else {
            return next.run(ctx).await;
        };

        let mut depth = 0;
        task.modify_property(|value: Option<DependDepth>| {
            depth = value.map_or(0, |DependDepth(depth)| depth);
            DependDepth(depth + 1)
        });
        if depth == 0 {
            lock.release();
        }

        let result = next.run(ctx).await;

        let mut remaining = 0;
        task.modify_property(|value: Option<DependDepth>| {
            remaining = value.map_or(0, |DependDepth(depth)| depth).saturating_sub(1);
            DependDepth(remaining)
        });
        if remaining == 0 {
            lock.acquire().await;
        }

        result
    }
}
