//! Ready-made middlewares.
//!
//! None of these add engine semantics; they observe or transform the two
//! events the engine emits. They double as reference implementations for
//! writing your own [`Middleware`](crate::Middleware).

mod graphviz;
mod limit;
mod logging;
mod recover;

pub use graphviz::DependGraphviz;
pub use limit::{with_lock, ConcurrencyLimiter, Lock, SemaphoreLock};
pub use logging::Logging;
pub use recover::{PanicPayload, Recover};
