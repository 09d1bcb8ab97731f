//! Task results.
//!
//! A [`TaskResult`] is published exactly once per task and handed out to every
//! awaiter, so both its value and its error are reference-counted.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;

/// A task's output value, type-erased and shared across awaiters.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A task's failure, shared across awaiters.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Erase a concrete value into the form task bodies return.
///
/// ```
/// use taskset::value;
///
/// let v = value(42_i32);
/// assert_eq!(v.downcast_ref::<i32>(), Some(&42));
/// ```
pub fn value<V: Any + Send + Sync>(v: V) -> Value {
    Arc::new(v)
}

/// Erase a concrete error into the form task bodies return.
///
/// ```
/// use taskset::fail;
///
/// let err = fail(std::io::Error::other("unreachable"));
/// assert_eq!(err.to_string(), "unreachable");
/// ```
pub fn fail<E: std::error::Error + Send + Sync + 'static>(err: E) -> SharedError {
    Arc::new(err)
}

/// The outcome of running a task.
///
/// A result is a success iff [`err`](TaskResult::err) returns `None`; the
/// value is unspecified on failure. A published result is immutable: a
/// middleware that transforms a result hands its caller a new one, the result
/// stored in the task is never touched.
#[derive(Clone)]
pub struct TaskResult {
    value: Option<Value>,
    err: Option<SharedError>,
}

impl TaskResult {
    /// A successful result carrying `value`.
    pub fn ok<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            value: Some(Arc::new(value)),
            err: None,
        }
    }

    /// A failed result carrying `err`.
    pub fn failed<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self {
            value: None,
            err: Some(Arc::new(err)),
        }
    }

    /// A successful result with no value.
    pub fn empty() -> Self {
        Self {
            value: None,
            err: None,
        }
    }

    pub(crate) fn from_body(output: Result<Value, SharedError>) -> Self {
        match output {
            Ok(value) => Self {
                value: Some(value),
                err: None,
            },
            Err(err) => Self {
                value: None,
                err: Some(err),
            },
        }
    }

    /// The synthetic result an abandoned wait returns.
    pub(crate) fn from_cause(cause: Error) -> Self {
        Self {
            value: None,
            err: Some(cause.shared()),
        }
    }

    /// Whether the task succeeded.
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// The task's value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The task's failure, if any.
    pub fn err(&self) -> Option<&SharedError> {
        self.err.as_ref()
    }

    /// Borrow the value as a concrete type.
    ///
    /// Returns `None` if the result has no value or the value is of a
    /// different type.
    pub fn downcast_value<T: Any>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref()
    }
}

impl fmt::Debug for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskResult")
            .field("value", &self.value.as_ref().map(|_| "<opaque>"))
            .field("err", &self.err)
            .finish()
    }
}
