//! Cancellation-aware, value-carrying execution contexts.
//!
//! The engine threads two distinct context roles through every operation: the
//! *run context* delivered to a task body for its whole run, and a per-await
//! *wait context* that governs only that await. Both are the same type. A
//! [`Context`] is a cheap-clone handle onto an immutable chain of frames, each
//! frame adding either one typed value or one cancellation source; deriving a
//! child never mutates the parent.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// An immutable, derivable execution context.
///
/// Start from [`Context::background`], then derive children with
/// [`with_value`](Context::with_value), [`with_cancel`](Context::with_cancel),
/// or [`with_timeout`](Context::with_timeout). Cancelling a context cancels
/// every context derived from it, never its ancestors.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Frame>,
}

struct Frame {
    parent: Option<Context>,
    value: Option<(TypeId, Box<dyn Any + Send + Sync>)>,
    cancel: Option<CancelSource>,
    token: CancellationToken,
}

struct CancelSource {
    cause: Mutex<Option<Error>>,
}

impl Context {
    /// The root context: carries no values and is never cancelled.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Frame {
                parent: None,
                value: None,
                cancel: None,
                token: CancellationToken::new(),
            }),
        }
    }

    /// Derive a child carrying one typed value.
    ///
    /// Lookup is by value type, nearest frame first; deriving with the same
    /// type again shadows the older frame. Define a dedicated type per
    /// concern rather than storing primitives directly.
    pub fn with_value<V: Any + Send + Sync>(&self, value: V) -> Self {
        Self {
            inner: Arc::new(Frame {
                parent: Some(self.clone()),
                value: Some((TypeId::of::<V>(), Box::new(value))),
                cancel: None,
                token: self.inner.token.clone(),
            }),
        }
    }

    /// The nearest value of type `V`, if any frame up the chain carries one.
    pub fn value<V: Any>(&self) -> Option<&V> {
        self.values().next()
    }

    /// Every value of type `V` up the chain, nearest first.
    pub(crate) fn values<V: Any>(&self) -> Values<'_, V> {
        Values {
            frame: Some(self),
            _type: PhantomData,
        }
    }

    /// Derive a cancellable child and the handle that cancels it.
    ///
    /// Cancelling the parent also cancels the child. Dropping the [`Canceler`]
    /// does nothing; the child simply stays bound to its parent's lifetime.
    pub fn with_cancel(&self) -> (Self, Canceler) {
        let ctx = Self {
            inner: Arc::new(Frame {
                parent: Some(self.clone()),
                value: None,
                cancel: Some(CancelSource {
                    cause: Mutex::new(None),
                }),
                token: self.inner.token.child_token(),
            }),
        };
        let canceler = Canceler { ctx: ctx.clone() };
        (ctx, canceler)
    }

    /// Derive a cancellable child that cancels itself after `timeout`.
    ///
    /// The deadline fires [`Error::DeadlineExceeded`]; the returned
    /// [`Canceler`] may still cancel earlier with [`Error::Canceled`]. Must be
    /// called within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, Canceler) {
        let (ctx, canceler) = self.with_cancel();
        let deadline = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => deadline.cancel_with(Error::DeadlineExceeded),
                _ = deadline.cancelled() => {}
            }
        });
        (ctx, canceler)
    }

    /// Resolves once this context is cancelled; pends forever on a context
    /// with no cancellable ancestor.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }

    /// Whether this context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Why this context was cancelled, or `None` if it was not.
    ///
    /// The cause is recorded before the cancellation signal fires, so any
    /// observer that saw [`is_cancelled`](Context::is_cancelled) will find it.
    pub fn cause(&self) -> Option<Error> {
        if !self.is_cancelled() {
            return None;
        }

        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(source) = &ctx.inner.cancel {
                if let Some(cause) = source.cause.lock().clone() {
                    return Some(cause);
                }
            }
            current = ctx.inner.parent.as_ref();
        }
        Some(Error::Canceled)
    }

    fn cancel_with(&self, cause: Error) {
        if let Some(source) = &self.inner.cancel {
            let mut slot = source.cause.lock();
            if slot.is_none() {
                *slot = Some(cause);
            }
            drop(slot);
            self.inner.token.cancel();
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Cancels the context returned alongside it by [`Context::with_cancel`] or
/// [`Context::with_timeout`].
pub struct Canceler {
    ctx: Context,
}

impl Canceler {
    /// Cancel the context with [`Error::Canceled`]. Idempotent; a cause that
    /// already fired (including a deadline) is not overwritten.
    pub fn cancel(&self) {
        self.ctx.cancel_with(Error::Canceled);
    }
}

/// Iterator over every value of one type up a context chain.
pub(crate) struct Values<'a, V> {
    frame: Option<&'a Context>,
    _type: PhantomData<V>,
}

impl<'a, V: Any> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        while let Some(ctx) = self.frame {
            self.frame = ctx.inner.parent.as_ref();
            if let Some((type_id, boxed)) = &ctx.inner.value {
                if *type_id == TypeId::of::<V>() {
                    return boxed.downcast_ref();
                }
            }
        }
        None
    }
}
