//! Task: the basic unit of work and concurrency.
//!
//! Each task body runs on its own detached worker, launched at most once. The
//! worker publishes the task's result through a broadcast completion signal,
//! so any number of awaiters observe the same result without re-running the
//! body.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::context::Context;
use crate::depend::Depend;
use crate::error::Error;
use crate::middleware::{Middleware, Next};
use crate::result::{SharedError, TaskResult, Value};
use crate::set::SetCore;

/// The boxed body of a task.
///
/// Bodies are handed the run context and a [`Depend`] for declaring
/// dependencies on sibling tasks. Do not use
/// [`TaskSet::result`](crate::TaskSet::result) from inside a body.
pub(crate) type RunFn =
    Box<dyn FnOnce(Context, Depend) -> BoxFuture<'static, Result<Value, SharedError>> + Send>;

/// A builder-style mutation applied to a task at creation time.
///
/// Properties write typed metadata into the task's property bag via
/// [`Task::modify_property`]; when several properties touch the same key, the
/// last one wins. See [`properties`](crate::properties) for ready-made ones.
pub type Property = Box<dyn FnOnce(&Task) + Send>;

/// A unit of work created by a [`TaskSet`](crate::TaskSet).
///
/// `Task` is a cheap-clone handle; clones refer to the same unit of work.
/// Equality and hashing follow handle identity, not structure.
///
/// Execution is driven indirectly: eager tasks launch on
/// [`TaskSet::start`](crate::TaskSet::start), lazy tasks launch the first
/// time anything declares a dependency on them. The public surface of a task
/// is its property bag, which is meant for middlewares.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

struct TaskInner {
    set: Arc<SetCore>,
    run: Mutex<Option<RunFn>>,
    properties: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
    launched: AtomicBool,
    started: AtomicBool,
    // Result slot and completion signal in one: the watch send is the
    // publish-then-wake that makes the result visible to every awaiter.
    done: watch::Sender<Option<TaskResult>>,
}

impl Task {
    pub(crate) fn new(set: Arc<SetCore>, run: RunFn) -> Self {
        let (done, _) = watch::channel(None);
        Self {
            inner: Arc::new(TaskInner {
                set,
                run: Mutex::new(Some(run)),
                properties: Mutex::new(HashMap::new()),
                launched: AtomicBool::new(false),
                started: AtomicBool::new(false),
                done,
            }),
        }
    }

    pub(crate) fn set(&self) -> &Arc<SetCore> {
        &self.inner.set
    }

    /// Whether this task's body has been launched. Observation only; a task
    /// that reports `true` may not have published its result yet.
    pub fn started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Launch the task if nobody has, then wait for its result.
    ///
    /// The context of the launching caller becomes the run context; contexts
    /// of later callers only govern their own wait.
    pub(crate) async fn force(&self, ctx: &Context) -> TaskResult {
        if self
            .inner
            .launched
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.spawn_worker(ctx.clone());
        }

        self.wait(ctx).await
    }

    fn spawn_worker(&self, ctx: Context) {
        self.inner.started.store(true, Ordering::Release);

        let run = self
            .inner
            .run
            .lock()
            .take()
            .expect("launch latch admits a single worker");
        let task = self.clone();

        tokio::spawn(async move {
            let depend = Depend::new(task.clone());
            let inner = Next::new(move |ctx| {
                let body = run(ctx, depend);
                async move { TaskResult::from_body(body.await) }.boxed()
            });

            let chain = task.inner.set.middleware.clone();
            let result = AssertUnwindSafe(chain.run(ctx, task.clone(), inner))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload);
                    tracing::error!(panic_message = %message, "task panicked");
                    TaskResult::failed(Error::Panicked(message))
                });

            task.inner.done.send_replace(Some(result));
        });
    }

    /// Wait for the result without launching the task. Cancelling `ctx`
    /// abandons only this wait; the worker and the stored result are
    /// unaffected.
    pub(crate) async fn wait(&self, ctx: &Context) -> TaskResult {
        let mut done = self.inner.done.subscribe();
        tokio::select! {
            _ = ctx.cancelled() => TaskResult::from_cause(ctx.cause().unwrap_or(Error::Canceled)),
            published = done.wait_for(|result| result.is_some()) => {
                // The sender lives inside this task, so the channel cannot
                // close while `self` is borrowed.
                let published = published.expect("completion channel closed");
                published.as_ref().expect("guarded by wait_for").clone()
            }
        }
    }

    /// This task's property of type `P`, if one was stored.
    ///
    /// Properties are meant for middlewares; see
    /// [`modify_property`](Task::modify_property) for the write side.
    pub fn property<P>(&self) -> Option<P>
    where
        P: Any + Clone + Send,
    {
        self.inner
            .properties
            .lock()
            .get(&TypeId::of::<P>())
            .and_then(|boxed| boxed.downcast_ref::<P>())
            .cloned()
    }

    /// Read-modify-write this task's property of type `P`.
    ///
    /// `modify` runs while the property bag is locked, so concurrent
    /// modifications of the same task serialize; middlewares rely on this to
    /// keep counters consistent. `modify` must not block and must not call
    /// back into the same task's property API.
    pub fn modify_property<P, F>(&self, modify: F)
    where
        P: Any + Send,
        F: FnOnce(Option<P>) -> P,
    {
        let mut properties = self.inner.properties.lock();
        let old = properties
            .remove(&TypeId::of::<P>())
            .and_then(|boxed| boxed.downcast::<P>().ok())
            .map(|boxed| *boxed);
        properties.insert(TypeId::of::<P>(), Box::new(modify(old)));
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("started", &self.started())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
