//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::result::TaskResult;
use crate::task::Task;

/// Payload of a caught panic, as `std::panic::catch_unwind` delivers it.
pub type PanicPayload = Box<dyn Any + Send>;

/// Converts a panicking task into an ordinary failed result.
///
/// This is the one legal place to catch a panic crossing `next`: the handler
/// receives the payload and produces the result the task publishes. Without a
/// `Recover` in the chain, the engine itself converts the panic into an
/// [`Error::Panicked`](crate::Error::Panicked) failure.
///
/// Place `Recover` before any middleware whose `run` hook must observe the
/// recovered result rather than the unwind.
pub struct Recover<H> {
    handle: H,
}

impl<H> Recover<H>
where
    H: Fn(PanicPayload) -> TaskResult + Send + Sync,
{
    /// Recover panics with `handle`.
    pub fn new(handle: H) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl<H> Middleware for Recover<H>
where
    H: Fn(PanicPayload) -> TaskResult + Send + Sync,
{
    async fn run(&self, ctx: Context, _task: Task, next: Next) -> TaskResult {
        match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => (self.handle)(payload),
        }
    }
}
