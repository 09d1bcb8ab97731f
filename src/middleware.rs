//! Middleware: composable interceptors around task execution and dependency
//! declaration.
//!
//! A middleware observes and/or transforms the two events the engine emits:
//! a task starting to run, and a running task declaring a dependency. Hooks
//! wrap a continuation ([`Next`]); a chain of middlewares composes so that the
//! first entry is the outermost wrapper. Composition is a monoid: the empty
//! [`Chain`] is the identity, and chains nest because [`Chain`] is itself a
//! [`Middleware`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::result::TaskResult;
use crate::task::Task;

/// The continuation a middleware hook must invoke exactly once.
///
/// `Next` is consumed by [`run`](Next::run), so calling it twice is
/// unrepresentable. Returning from a hook without calling it at all violates
/// the middleware contract; debug builds log the dropped continuation at
/// error level.
pub struct Next {
    f: Option<Box<dyn FnOnce(Context) -> BoxFuture<'static, TaskResult> + Send>>,
}

impl Next {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: FnOnce(Context) -> BoxFuture<'static, TaskResult> + Send + 'static,
    {
        Self {
            f: Some(Box::new(f)),
        }
    }

    /// Invoke the rest of the chain.
    ///
    /// The context passed here must derive from the context the hook
    /// received.
    pub async fn run(mut self, ctx: Context) -> TaskResult {
        let f = self.f.take().expect("Next is consumed exactly once");
        f(ctx).await
    }
}

impl Drop for Next {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        if self.f.is_some() && !std::thread::panicking() {
            tracing::error!("middleware dropped its continuation without calling it");
        }
    }
}

/// Injects code into task execution and dependency declaration.
///
/// Both hooks default to pass-through, so a middleware implements only the
/// events it cares about. Hooks may examine and modify task properties, may
/// pass a context derived from their input context to `next`, and may return
/// a result that differs from what `next` returned; a transformed result is
/// only seen by the caller of the event, the task's stored result is never
/// modified.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Called when a task is about to execute; `next` runs the task body
    /// (through any remaining middlewares) and must be called exactly once.
    async fn run(&self, ctx: Context, task: Task, next: Next) -> TaskResult {
        let _ = task;
        next.run(ctx).await
    }

    /// Called when `task` declares a dependency on `dependency`; `next`
    /// launches the dependency if needed and waits for its result, and must
    /// be called exactly once.
    async fn depend(&self, ctx: Context, task: Task, dependency: Task, next: Next) -> TaskResult {
        let _ = (task, dependency);
        next.run(ctx).await
    }
}

/// The composition of an ordered list of middlewares.
///
/// Entry `0` is the outermost wrapper: its hook runs first and its `next`
/// ultimately reaches entry `1`, and so on down to the event itself. `Chain`
/// implements [`Middleware`], so chains can be nested in other chains;
/// nesting does not change the observable order
/// (`[a, [b, c]]` behaves as `[[a, b], c]` behaves as `[a, b, c]`), and the
/// empty chain is the identity.
#[derive(Clone, Default)]
pub struct Chain {
    stack: Arc<[Arc<dyn Middleware>]>,
}

impl Chain {
    /// Compose `middlewares` in order, first entry outermost.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            stack: middlewares.into(),
        }
    }

    fn dispatch_run(
        self,
        index: usize,
        ctx: Context,
        task: Task,
        inner: Next,
    ) -> BoxFuture<'static, TaskResult> {
        Box::pin(async move {
            match self.stack.get(index) {
                None => inner.run(ctx).await,
                Some(middleware) => {
                    let middleware = Arc::clone(middleware);
                    let chain = self.clone();
                    let chained_task = task.clone();
                    let next =
                        Next::new(move |ctx| chain.dispatch_run(index + 1, ctx, chained_task, inner));
                    middleware.run(ctx, task, next).await
                }
            }
        })
    }

    fn dispatch_depend(
        self,
        index: usize,
        ctx: Context,
        task: Task,
        dependency: Task,
        inner: Next,
    ) -> BoxFuture<'static, TaskResult> {
        Box::pin(async move {
            match self.stack.get(index) {
                None => inner.run(ctx).await,
                Some(middleware) => {
                    let middleware = Arc::clone(middleware);
                    let chain = self.clone();
                    let chained_task = task.clone();
                    let chained_dependency = dependency.clone();
                    let next = Next::new(move |ctx| {
                        chain.dispatch_depend(index + 1, ctx, chained_task, chained_dependency, inner)
                    });
                    middleware.depend(ctx, task, dependency, next).await
                }
            }
        })
    }
}

#[async_trait]
impl Middleware for Chain {
    async fn run(&self, ctx: Context, task: Task, next: Next) -> TaskResult {
        self.clone().dispatch_run(0, ctx, task, next).await
    }

    async fn depend(&self, ctx: Context, task: Task, dependency: Task, next: Next) -> TaskResult {
        self.clone()
            .dispatch_depend(0, ctx, task, dependency, next)
            .await
    }
}
