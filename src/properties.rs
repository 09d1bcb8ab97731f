//! Ready-made task properties.
//!
//! A property is applied to a task at creation time and writes typed metadata
//! into the task's property bag; middlewares read it back while observing the
//! task. See [`Property`](crate::Property) for the contract.

use crate::task::{Property, Task};

#[derive(Clone)]
struct Name(String);

/// Attach a human-readable name to a task, for logging and graph rendering.
///
/// ```no_run
/// use taskset::{properties, value, TaskSet};
///
/// let set = TaskSet::default();
/// let task = set.new_lazy(
///     |_ctx, _depend| async { Ok(value(())) },
///     vec![properties::with_name("fetch-config")],
/// );
/// assert_eq!(properties::name(&task).as_deref(), Some("fetch-config"));
/// ```
pub fn with_name(name: impl Into<String>) -> Property {
    let name = name.into();
    Box::new(move |task: &Task| {
        task.modify_property(move |_: Option<Name>| Name(name));
    })
}

/// The name attached with [`with_name`], if any. Meant for middlewares.
pub fn name(task: &Task) -> Option<String> {
    task.property::<Name>().map(|Name(name)| name)
}
