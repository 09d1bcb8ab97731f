//! Error types for the task engine.
//!
//! Task bodies report their own failures as [`SharedError`](crate::SharedError)
//! values carried inside a [`TaskResult`](crate::TaskResult); this module
//! defines the errors the engine synthesizes on a task's behalf.

use std::sync::Arc;

use crate::result::SharedError;

/// Errors synthesized by the engine itself.
///
/// These show up as the `err` of a [`TaskResult`](crate::TaskResult) when a
/// wait is abandoned or a task body panics; they are never stored as a task's
/// own result unless the task actually failed that way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A wait was abandoned because its context was cancelled.
    #[error("context canceled")]
    Canceled,

    /// A wait was abandoned because its context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A task body panicked and no recovery middleware intercepted it.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl Error {
    /// Wrap this error in the shared, clonable form results carry.
    pub fn shared(self) -> SharedError {
        Arc::new(self)
    }
}
