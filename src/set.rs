//! TaskSet: creates and runs tasks.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::Context;
use crate::depend::Depend;
use crate::middleware::{Chain, Middleware};
use crate::result::{SharedError, TaskResult, Value};
use crate::task::{Property, RunFn, Task};

pub(crate) type SetId = u64;

static NEXT_SET_ID: AtomicU64 = AtomicU64::new(0);

/// Marker attached to run contexts so [`TaskSet::result`] can detect calls
/// made from inside a running task of the same set.
pub(crate) struct SetMarker(pub(crate) SetId);

/// The part of a set every task keeps a reference to.
pub(crate) struct SetCore {
    pub(crate) id: SetId,
    pub(crate) middleware: Chain,
}

/// Creates and runs [`Task`]s that may depend on each other's results.
///
/// A set owns an ordered list of *eager* tasks (launched by
/// [`start`](TaskSet::start)) and a single composed middleware chain that
/// wraps every task execution and dependency declaration. Lazy tasks launch
/// the first time a sibling depends on them; a lazy task nothing depends on
/// never runs.
///
/// The engine does not detect dependency cycles: a cycle simply blocks all
/// involved tasks forever. Record the graph with
/// [`middlewares::DependGraphviz`](crate::middlewares::DependGraphviz) to
/// check acyclicity offline.
///
/// # Examples
///
/// ```no_run
/// use taskset::{value, Context, TaskSet};
///
/// # async {
/// let ctx = Context::background();
/// let set = TaskSet::default();
///
/// let a = set.new_task(|_ctx, _depend| async { Ok(value(1_i32)) }, vec![]);
/// let b = {
///     let a = a.clone();
///     set.new_task(
///         move |ctx, depend| async move {
///             let a = depend.on(&ctx, &a).await;
///             let a = a.downcast_value::<i32>().copied().unwrap_or_default();
///             Ok(value(a + 1))
///         },
///         vec![],
///     )
/// };
///
/// set.start(&ctx);
/// set.wait(&ctx).await;
/// assert_eq!(set.result(&ctx, &b).await.downcast_value::<i32>(), Some(&2));
/// # };
/// ```
pub struct TaskSet {
    core: Arc<SetCore>,
    eager: Mutex<Vec<Task>>,
}

impl TaskSet {
    /// Create a set whose events pass through `middlewares`, first entry
    /// outermost.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            core: Arc::new(SetCore {
                id: NEXT_SET_ID.fetch_add(1, Ordering::Relaxed),
                middleware: Chain::new(middlewares),
            }),
            eager: Mutex::new(Vec::new()),
        }
    }

    /// Create an eager task: it will launch when [`start`](TaskSet::start) is
    /// called.
    pub fn new_task<F, Fut>(&self, run: F, properties: Vec<Property>) -> Task
    where
        F: FnOnce(Context, Depend) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, SharedError>> + Send + 'static,
    {
        let task = self.new_lazy(run, properties);
        self.eager.lock().push(task.clone());
        task
    }

    /// Create a lazy task: it launches the first time any sibling declares a
    /// dependency on it, and never runs if nothing does.
    ///
    /// A lazy task can be promoted with [`eager`](TaskSet::eager).
    pub fn new_lazy<F, Fut>(&self, run: F, properties: Vec<Property>) -> Task
    where
        F: FnOnce(Context, Depend) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, SharedError>> + Send + 'static,
    {
        let run: RunFn = Box::new(move |ctx, depend| Box::pin(run(ctx, depend)));
        let task = Task::new(self.core.clone(), run);
        for property in properties {
            property(&task);
        }
        task
    }

    /// Promote an existing lazy task to eager.
    ///
    /// Accepts a task that is already eager; the launch latch keeps it from
    /// running twice, though [`wait`](TaskSet::wait) will observe each entry.
    ///
    /// # Panics
    ///
    /// Panics if `task` belongs to another set.
    pub fn eager(&self, task: &Task) {
        assert!(
            Arc::ptr_eq(task.set(), &self.core),
            "task doesn't belong to this task set"
        );
        self.eager.lock().push(task.clone());
    }

    /// Launch every eager task. `ctx` becomes the run context delivered to
    /// each task body; cancelling it asks the bodies themselves to stop.
    ///
    /// Calling `start` again re-scans the eager list: tasks already launched
    /// are unaffected, tasks registered since are launched. Must be called
    /// within a tokio runtime.
    pub fn start(&self, ctx: &Context) {
        let ctx = ctx.with_value(SetMarker(self.core.id));
        let tasks: Vec<Task> = self.eager.lock().clone();
        for task in tasks {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let _ = task.force(&ctx).await;
            });
        }
    }

    /// Wait for every eager task to complete, in registration order.
    ///
    /// `ctx` governs only this wait; cancelling it returns without affecting
    /// the tasks. `wait` never launches anything: without a prior
    /// [`start`](TaskSet::start) it blocks until cancelled.
    pub async fn wait(&self, ctx: &Context) {
        let tasks: Vec<Task> = self.eager.lock().clone();
        for task in tasks {
            task.wait(ctx).await;
        }
    }

    /// Wait for `task`'s result.
    ///
    /// `ctx` governs only this wait. `result` never launches anything: a task
    /// that is never run blocks this call until `ctx` is cancelled.
    ///
    /// # Panics
    ///
    /// Panics if `task` belongs to another set, or when called from inside a
    /// running task of this set — bodies must declare dependencies through
    /// their [`Depend`] instead.
    pub async fn result(&self, ctx: &Context, task: &Task) -> TaskResult {
        assert!(
            Arc::ptr_eq(task.set(), &self.core),
            "task doesn't belong to this task set"
        );
        if ctx.values::<SetMarker>().any(|marker| marker.0 == self.core.id) {
            panic!("don't call TaskSet::result from inside a task; declare the dependency with Depend instead");
        }

        task.wait(ctx).await
    }
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
