//! `TaskSet::result` refuses to run inside a task of the same set.

use std::sync::Arc;

use taskset::{value, Context, Error, TaskSet};

#[tokio::test]
async fn result_inside_a_task_aborts() {
    let set = Arc::new(TaskSet::default());

    let other = set.new_task(|_ctx, _depend| async { Ok(value(1_i32)) }, vec![]);
    let offender = {
        let (set, other) = (set.clone(), other.clone());
        set.clone().new_task(
            move |ctx, _depend| async move {
                // Wrong: bodies must go through their Depend.
                let _ = set.result(&ctx, &other).await;
                Ok(value(()))
            },
            vec![],
        )
    };

    let ctx = Context::background();
    set.start(&ctx);

    let result = set.result(&ctx, &offender).await;
    match result.err().and_then(|err| err.downcast_ref::<Error>()) {
        Some(Error::Panicked(message)) => {
            assert!(message.contains("Depend"), "message: {message}");
        }
        other => panic!("expected a panic failure, got {other:?}"),
    }
}

#[tokio::test]
async fn result_on_a_sibling_set_is_allowed() {
    let outer = TaskSet::default();

    let task = outer.new_task(
        |ctx, _depend| async move {
            // A nested set is a different set; its marker does not clash with
            // the outer one.
            let inner = TaskSet::default();
            let inner_task = inner.new_task(|_ctx, _depend| async { Ok(value(5_i32)) }, vec![]);
            inner.start(&ctx);

            let inner_result = inner.result(&ctx, &inner_task).await;
            Ok(value(inner_result.downcast_value::<i32>().copied().unwrap_or_default()))
        },
        vec![],
    );

    let ctx = Context::background();
    outer.start(&ctx);

    assert_eq!(
        outer.result(&ctx, &task).await.downcast_value::<i32>(),
        Some(&5)
    );
}
