//! Start/finish logging through `tracing`.

use async_trait::async_trait;

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::properties;
use crate::result::TaskResult;
use crate::task::Task;

/// Logs task execution and dependency declaration as `tracing` events.
///
/// Run events log at `INFO` (failures at `WARN`), dependency events at
/// `DEBUG`. Tasks are identified by their
/// [`properties::with_name`](crate::properties::with_name) name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging;

fn task_name(task: &Task) -> String {
    properties::name(task).unwrap_or_else(|| "<unnamed>".to_string())
}

#[async_trait]
impl Middleware for Logging {
    async fn run(&self, ctx: Context, task: Task, next: Next) -> TaskResult {
        let name = task_name(&task);
        tracing::info!(task = %name, "task starting");

        let result = next.run(ctx).await;

        match result.err() {
            Some(err) => tracing::warn!(task = %name, error = %err, "task failed"),
            None => tracing::info!(task = %name, "task finished"),
        }
        result
    }

    async fn depend(&self, ctx: Context, task: Task, dependency: Task, next: Next) -> TaskResult {
        let name = task_name(&task);
        let dependency = task_name(&dependency);
        tracing::debug!(task = %name, dependency = %dependency, "dependency declared");

        let result = next.run(ctx).await;

        tracing::debug!(task = %name, dependency = %dependency, "dependency resolved");
        result
    }
}
