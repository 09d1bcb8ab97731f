//! Middlewares may substitute the result a caller observes.

use std::sync::Arc;

use async_trait::async_trait;

use taskset::{fail, value, Context, Middleware, Next, Task, TaskResult, TaskSet};

use crate::common::TestError;

/// Replaces any failing run result with a zero.
struct ZeroOnFailure;

#[async_trait]
impl Middleware for ZeroOnFailure {
    async fn run(&self, ctx: Context, _task: Task, next: Next) -> TaskResult {
        let result = next.run(ctx).await;
        if result.is_ok() {
            result
        } else {
            TaskResult::ok(0_i32)
        }
    }
}

/// Masks failures of dependencies from their dependents only.
struct MaskDependencyFailures;

#[async_trait]
impl Middleware for MaskDependencyFailures {
    async fn depend(&self, ctx: Context, _task: Task, _dependency: Task, next: Next) -> TaskResult {
        let result = next.run(ctx).await;
        if result.is_ok() {
            result
        } else {
            TaskResult::ok(-1_i32)
        }
    }
}

#[tokio::test]
async fn run_hook_replaces_a_failing_result() {
    let set = TaskSet::new(vec![Arc::new(ZeroOnFailure) as Arc<dyn Middleware>]);
    let failing = set.new_task(
        |_ctx, _depend| async { Err(fail(TestError("e"))) },
        vec![],
    );

    let ctx = Context::background();
    set.start(&ctx);

    let result = set.result(&ctx, &failing).await;
    assert!(result.is_ok());
    assert_eq!(result.downcast_value::<i32>(), Some(&0));
}

#[tokio::test]
async fn depend_hook_transforms_only_what_the_dependent_sees() {
    let set = TaskSet::new(vec![Arc::new(MaskDependencyFailures) as Arc<dyn Middleware>]);

    let failing = set.new_lazy(
        |_ctx, _depend| async { Err(fail(TestError("e"))) },
        vec![],
    );
    let dependent = {
        let failing = failing.clone();
        set.new_task(
            move |ctx, depend| async move {
                let masked = depend.on(&ctx, &failing).await;
                Ok(value(masked.downcast_value::<i32>().copied().unwrap_or_default()))
            },
            vec![],
        )
    };

    let ctx = Context::background();
    set.start(&ctx);

    // The dependent saw the masked value...
    assert_eq!(
        set.result(&ctx, &dependent).await.downcast_value::<i32>(),
        Some(&-1)
    );
    // ...but the stored result still carries the original failure.
    let stored = set.result(&ctx, &failing).await;
    assert_eq!(
        stored.err().and_then(|err| err.downcast_ref::<TestError>()),
        Some(&TestError("e"))
    );
}
