//! A lazy diamond: two sources forced in parallel by one consumer.

use std::time::{Duration, Instant};

use tokio::time::sleep;

use taskset::properties::with_name;
use taskset::{value, Context, TaskSet};

#[tokio::main]
async fn main() {
    let ctx = Context::background();
    let set = TaskSet::default();

    let left = set.new_lazy(
        |_ctx, _depend| async {
            sleep(Duration::from_secs(1)).await;
            Ok(value(1_i32))
        },
        vec![with_name("left")],
    );
    let right = set.new_lazy(
        |_ctx, _depend| async {
            sleep(Duration::from_secs(1)).await;
            Ok(value(2_i32))
        },
        vec![with_name("right")],
    );

    let sum = {
        let (left, right) = (left.clone(), right.clone());
        set.new_task(
            move |ctx, depend| async move {
                // Both sources launch immediately; one second total, not two.
                depend.sync_group(&ctx, &[&left, &right]).await;

                let left = depend.on(&ctx, &left).await.downcast_value::<i32>().copied();
                let right = depend.on(&ctx, &right).await.downcast_value::<i32>().copied();
                Ok(value(left.unwrap_or_default() + right.unwrap_or_default()))
            },
            vec![with_name("sum")],
        )
    };

    let started = Instant::now();
    set.start(&ctx);
    set.wait(&ctx).await;

    let result = set.result(&ctx, &sum).await;
    println!(
        "sum = {:?} in {:.1}s",
        result.downcast_value::<i32>(),
        started.elapsed().as_secs_f32()
    );
}
