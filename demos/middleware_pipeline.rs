//! Observability middlewares around a small pipeline: tracing logs plus a
//! rendered dependency graph.

use std::sync::Arc;

use taskset::middlewares::{DependGraphviz, Logging};
use taskset::properties::with_name;
use taskset::{value, Context, Middleware, TaskSet};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let graph = DependGraphviz::new();
    let set = TaskSet::new(vec![
        Arc::new(Logging) as Arc<dyn Middleware>,
        Arc::new(graph.clone()) as Arc<dyn Middleware>,
    ]);

    let fetch = set.new_lazy(
        |_ctx, _depend| async { Ok(value(String::from("payload"))) },
        vec![with_name("fetch")],
    );
    let process = {
        let fetch = fetch.clone();
        set.new_task(
            move |ctx, depend| async move {
                let payload = depend.on(&ctx, &fetch).await;
                let payload = payload.downcast_value::<String>().cloned().unwrap_or_default();
                Ok(value(payload.to_uppercase()))
            },
            vec![with_name("process")],
        )
    };

    let ctx = Context::background();
    set.start(&ctx);
    set.wait(&ctx).await;

    let result = set.result(&ctx, &process).await;
    println!("processed: {:?}", result.downcast_value::<String>());
    print!("{graph}");
}
