//! At-most-once launch, however many awaiters pile up.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use test_case::test_case;
use tokio::time::sleep;

use taskset::{fail, value, Context, TaskSet};

#[test_case(2; "two awaiters")]
#[test_case(8; "eight awaiters")]
#[test_case(32; "thirty-two awaiters")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_awaiters_share_one_run(awaiters: usize) {
    crate::common::init_tracing();
    let runs = Arc::new(AtomicU32::new(0));
    let set = Arc::new(TaskSet::default());

    let counted = runs.clone();
    let task = set.new_task(
        move |_ctx, _depend| async move {
            counted.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(30)).await;
            Ok(value(1234_i64))
        },
        vec![],
    );

    let ctx = Context::background();
    set.start(&ctx);

    let mut handles = Vec::new();
    for _ in 0..awaiters {
        let set = set.clone();
        let task = task.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move { set.result(&ctx, &task).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("awaiter finished"));
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let first = results[0].value().expect("task has a value");
    for result in &results {
        assert_eq!(result.downcast_value::<i64>(), Some(&1234));
        // Identity, not just equality: every awaiter sees the same published
        // allocation.
        assert!(Arc::ptr_eq(first, result.value().expect("task has a value")));
    }
}

#[tokio::test]
async fn dependents_share_one_run_of_their_target() {
    let runs = Arc::new(AtomicU32::new(0));
    let set = TaskSet::default();

    let counted = runs.clone();
    let shared = set.new_lazy(
        move |_ctx, _depend| async move {
            counted.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(20)).await;
            Ok(value(7_i32))
        },
        vec![],
    );

    let mut dependents = Vec::new();
    for _ in 0..6 {
        let shared = shared.clone();
        dependents.push(set.new_task(
            move |ctx, depend| async move {
                let result = depend.on(&ctx, &shared).await;
                Ok(value(result.downcast_value::<i32>().copied().unwrap_or_default()))
            },
            vec![],
        ));
    }

    let ctx = Context::background();
    set.start(&ctx);
    set.wait(&ctx).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    for dependent in &dependents {
        let result = set.result(&ctx, dependent).await;
        assert_eq!(result.downcast_value::<i32>(), Some(&7));
    }
}

#[tokio::test]
async fn failed_results_are_shared_too() {
    use crate::common::TestError;

    let set = Arc::new(TaskSet::default());
    let task = set.new_task(
        |_ctx, _depend| async { Err(fail(TestError("shared failure"))) },
        vec![],
    );

    let ctx = Context::background();
    set.start(&ctx);

    let first = set.result(&ctx, &task).await;
    let second = set.result(&ctx, &task).await;

    let first = first.err().expect("task failed");
    let second = second.err().expect("task failed");
    assert_eq!(first.downcast_ref::<TestError>(), Some(&TestError("shared failure")));
    assert!(Arc::ptr_eq(first, second));
}
