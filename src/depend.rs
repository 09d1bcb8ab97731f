//! Dependency declaration: how a running task awaits its siblings.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::result::TaskResult;
use crate::task::Task;

/// Declares dependencies on sibling tasks from the same set.
///
/// Every task body receives a `Depend`. Use [`on`](Depend::on) to await one
/// sibling, or [`err_group`](Depend::err_group) /
/// [`sync_group`](Depend::sync_group) to await several in parallel. Do not
/// use [`TaskSet::result`](crate::TaskSet::result) from inside a body; it
/// panics to catch exactly that mistake.
#[derive(Clone)]
pub struct Depend {
    task: Task,
}

impl Depend {
    pub(crate) fn new(task: Task) -> Self {
        Self { task }
    }

    /// Await `dependency`'s result, launching it first if it is lazy and not
    /// yet running.
    ///
    /// The call threads through the set's middleware `depend` hooks, which
    /// may transform the result this caller observes; the dependency's stored
    /// result is unaffected. Dependency cycles are not detected and block
    /// forever.
    ///
    /// # Panics
    ///
    /// Panics if `dependency` was created by a different set.
    pub async fn on(&self, ctx: &Context, dependency: &Task) -> TaskResult {
        assert!(
            Arc::ptr_eq(self.task.set(), dependency.set()),
            "dependency is from a different task set"
        );

        let target = dependency.clone();
        let inner = Next::new(move |ctx| async move { target.force(&ctx).await }.boxed());

        let chain = self.task.set().middleware.clone();
        chain
            .depend(ctx.clone(), self.task.clone(), dependency.clone(), inner)
            .await
    }

    /// Await `tasks` in parallel until the first failure.
    ///
    /// All targets are launched up front (one concurrent awaiter each), so
    /// lazy targets do not wait on one another the way sequential
    /// [`on`](Depend::on) calls would make them. Returns the first target
    /// whose result carries an error without waiting for the rest, or `None`
    /// once every target has succeeded. Nothing is cancelled on failure: the
    /// remaining targets keep running and their results stay retrievable.
    ///
    /// # Panics
    ///
    /// Panics if any target was created by a different set.
    pub async fn err_group(&self, ctx: &Context, tasks: &[&Task]) -> Option<Task> {
        let (outcome_tx, mut outcomes) = mpsc::unbounded_channel();
        for task in self.spawnable(tasks) {
            let outcome_tx = outcome_tx.clone();
            let depend = self.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let failed = depend.on(&ctx, &task).await.err().is_some();
                let _ = outcome_tx.send((task, failed));
            });
        }
        drop(outcome_tx);

        while let Some((task, failed)) = outcomes.recv().await {
            if failed {
                return Some(task);
            }
        }
        None
    }

    /// Await `tasks` in parallel until every one of them has completed,
    /// successfully or not.
    ///
    /// Like [`err_group`](Depend::err_group), all targets are launched up
    /// front; unlike it, failures do not end the wait early. Retrieve the
    /// individual results with [`on`](Depend::on) afterwards, which resolves
    /// immediately.
    ///
    /// # Panics
    ///
    /// Panics if any target was created by a different set.
    pub async fn sync_group(&self, ctx: &Context, tasks: &[&Task]) {
        let (done_tx, mut done) = mpsc::unbounded_channel();
        for task in self.spawnable(tasks) {
            let done_tx = done_tx.clone();
            let depend = self.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let _ = depend.on(&ctx, &task).await;
                let _ = done_tx.send(());
            });
        }
        drop(done_tx);

        while done.recv().await.is_some() {}
    }

    /// Membership-check `tasks` in the calling task's context, where the
    /// panic is recoverable, rather than inside detached awaiters.
    fn spawnable(&self, tasks: &[&Task]) -> Vec<Task> {
        tasks
            .iter()
            .map(|task| {
                assert!(
                    Arc::ptr_eq(self.task.set(), task.set()),
                    "dependency is from a different task set"
                );
                (*task).clone()
            })
            .collect()
    }
}
