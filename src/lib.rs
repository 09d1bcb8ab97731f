//! Concurrent named tasks with once-only launch, dependency declaration, and
//! composable middleware.
//!
//! # Overview
//!
//! A [`TaskSet`] coordinates a group of tasks whose bodies may depend on each
//! other's results:
//!
//! - **Once-only launch**: however many tasks await a sibling, its body runs
//!   at most once; every awaiter observes the same published [`TaskResult`].
//! - **Dependency declaration**: a running body calls [`Depend::on`] to block
//!   on a sibling, transparently launching it if it is lazy.
//!   [`Depend::err_group`] and [`Depend::sync_group`] await many siblings in
//!   parallel.
//! - **Middleware**: both events — a task running, a task depending — thread
//!   through a composable [`Middleware`] chain that observes or transforms
//!   them. See [`middlewares`] for ready-made ones.
//!
//! # Quick start
//!
//! ```no_run
//! use taskset::{value, Context, TaskSet};
//!
//! # async {
//! let ctx = Context::background();
//! let set = TaskSet::default();
//!
//! let a = set.new_task(|_ctx, _depend| async { Ok(value(1_i32)) }, vec![]);
//! let b = set.new_task(|_ctx, _depend| async { Ok(value(2_i32)) }, vec![]);
//!
//! let sum = {
//!     let (a, b) = (a.clone(), b.clone());
//!     set.new_task(
//!         move |ctx, depend| async move {
//!             // Launches nothing here (a and b are eager), but waits for
//!             // both in parallel and reports the first failure.
//!             if let Some(failed) = depend.err_group(&ctx, &[&a, &b]).await {
//!                 let result = depend.on(&ctx, &failed).await;
//!                 return Err(result.err().cloned().expect("err_group reported a failure"));
//!             }
//!             let a = *depend.on(&ctx, &a).await.downcast_value::<i32>().expect("a is an i32");
//!             let b = *depend.on(&ctx, &b).await.downcast_value::<i32>().expect("b is an i32");
//!             Ok(value(a + b))
//!         },
//!         vec![],
//!     )
//! };
//!
//! set.start(&ctx);
//! set.wait(&ctx).await;
//!
//! let result = set.result(&ctx, &sum).await;
//! assert_eq!(result.downcast_value::<i32>(), Some(&3));
//! # };
//! ```
//!
//! # Contexts
//!
//! Two context roles stay distinct throughout. The context passed to
//! [`TaskSet::start`] is the *run context*: it reaches every task body, and
//! cancelling it asks the bodies themselves to stop (cooperatively). The
//! context passed to [`TaskSet::wait`], [`TaskSet::result`], or [`Depend::on`]
//! is a *wait context*: cancelling it abandons only that wait — the awaited
//! task keeps running, and a later await with a fresh context observes its
//! eventual result.
//!
//! # Cycles
//!
//! The engine does not detect dependency cycles; a cycle blocks every
//! involved task forever. [`middlewares::DependGraphviz`] records the actual
//! dependency graph so acyclicity can be checked offline.

mod context;
mod depend;
mod error;
mod middleware;
pub mod middlewares;
pub mod properties;
mod result;
mod set;
mod task;

pub use context::{Canceler, Context};
pub use depend::Depend;
pub use error::Error;
pub use middleware::{Chain, Middleware, Next};
pub use result::{fail, value, SharedError, TaskResult, Value};
pub use set::TaskSet;
pub use task::{Property, Task};
