//! Dependencies must stay within one set.

use std::sync::Arc;

use taskset::{middlewares::Recover, value, Context, Error, Middleware, TaskResult, TaskSet};

use crate::common::TestError;

#[tokio::test]
async fn cross_set_depend_aborts_the_task() {
    let home = TaskSet::default();
    let foreign_set = TaskSet::default();
    let foreign = foreign_set.new_lazy(|_ctx, _depend| async { Ok(value(())) }, vec![]);

    let offender = {
        let foreign = foreign.clone();
        home.new_task(
            move |ctx, depend| async move {
                let _ = depend.on(&ctx, &foreign).await;
                Ok(value(()))
            },
            vec![],
        )
    };

    let ctx = Context::background();
    home.start(&ctx);

    // Without a recovery middleware the abort surfaces as a panic failure.
    let result = home.result(&ctx, &offender).await;
    match result.err().and_then(|err| err.downcast_ref::<Error>()) {
        Some(Error::Panicked(message)) => {
            assert!(message.contains("different task set"), "message: {message}");
        }
        other => panic!("expected a panic failure, got {other:?}"),
    }

    // The foreign task was never launched.
    assert!(!foreign.started());
    let _ = foreign_set;
}

#[tokio::test]
async fn recovery_middleware_catches_the_abort() {
    let home = TaskSet::new(vec![Arc::new(Recover::new(|_payload| {
        TaskResult::failed(TestError("recovered"))
    })) as Arc<dyn Middleware>]);
    let foreign_set = TaskSet::default();
    let foreign = foreign_set.new_lazy(|_ctx, _depend| async { Ok(value(())) }, vec![]);

    let offender = home.new_task(
        move |ctx, depend| async move {
            let _ = depend.on(&ctx, &foreign).await;
            Ok(value(()))
        },
        vec![],
    );

    let ctx = Context::background();
    home.start(&ctx);

    let result = home.result(&ctx, &offender).await;
    assert_eq!(
        result.err().and_then(|err| err.downcast_ref::<TestError>()),
        Some(&TestError("recovered"))
    );
}

#[tokio::test]
async fn group_targets_are_membership_checked_too() {
    let home = TaskSet::default();
    let foreign_set = TaskSet::default();
    let foreign = foreign_set.new_lazy(|_ctx, _depend| async { Ok(value(())) }, vec![]);

    let offender = {
        let foreign = foreign.clone();
        home.new_task(
            move |ctx, depend| async move {
                let _ = depend.err_group(&ctx, &[&foreign]).await;
                Ok(value(()))
            },
            vec![],
        )
    };

    let ctx = Context::background();
    home.start(&ctx);

    let result = home.result(&ctx, &offender).await;
    assert!(matches!(
        result.err().and_then(|err| err.downcast_ref::<Error>()),
        Some(Error::Panicked(_))
    ));
    assert!(!foreign.started());
}
