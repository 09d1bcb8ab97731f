//! SyncGroup: parallel waiting for every target.

use std::time::{Duration, Instant};

use tokio::time::sleep;

use taskset::{fail, value, Context, TaskSet};

use crate::common::TestError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lazy_targets_are_forced_up_front() {
    let set = TaskSet::default();

    // Sequential `on` calls would cost two sleeps: the second lazy task only
    // launches once the first resolves. The group launches both immediately.
    let first = set.new_lazy(
        |_ctx, _depend| async {
            sleep(Duration::from_millis(100)).await;
            Ok(value(1_i32))
        },
        vec![],
    );
    let second = set.new_lazy(
        |_ctx, _depend| async {
            sleep(Duration::from_millis(100)).await;
            Ok(value(2_i32))
        },
        vec![],
    );

    let group = {
        let (first, second) = (first.clone(), second.clone());
        set.new_task(
            move |ctx, depend| async move {
                depend.sync_group(&ctx, &[&first, &second]).await;

                // Both resolved already; these do not block.
                let first = depend.on(&ctx, &first).await.downcast_value::<i32>().copied();
                let second = depend.on(&ctx, &second).await.downcast_value::<i32>().copied();
                Ok(value(first.unwrap_or_default() + second.unwrap_or_default()))
            },
            vec![],
        )
    };

    let ctx = Context::background();
    let started = Instant::now();
    set.start(&ctx);
    set.wait(&ctx).await;
    let elapsed = started.elapsed();

    assert_eq!(set.result(&ctx, &group).await.downcast_value::<i32>(), Some(&3));
    assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "elapsed {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waits_for_every_target_despite_failures() {
    let set = TaskSet::default();

    let failing = set.new_lazy(
        |_ctx, _depend| async { Err(fail(TestError("fail"))) },
        vec![],
    );
    let slow = set.new_lazy(
        |_ctx, _depend| async {
            sleep(Duration::from_millis(150)).await;
            Ok(value(2_i32))
        },
        vec![],
    );

    let group = {
        let (failing, slow) = (failing.clone(), slow.clone());
        set.new_task(
            move |ctx, depend| async move {
                depend.sync_group(&ctx, &[&failing, &slow]).await;

                // Unlike err_group, the failure did not end the wait early:
                // the slow sibling must have published by now.
                let failed = depend.on(&ctx, &failing).await;
                let slow = depend.on(&ctx, &slow).await.downcast_value::<i32>().copied();
                Ok(value((failed.err().is_some(), slow.unwrap_or_default())))
            },
            vec![],
        )
    };

    let ctx = Context::background();
    let started = Instant::now();
    set.start(&ctx);

    let result = set.result(&ctx, &group).await;
    let elapsed = started.elapsed();

    assert_eq!(
        result.downcast_value::<(bool, i32)>(),
        Some(&(true, 2))
    );
    assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");
}
