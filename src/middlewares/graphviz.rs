//! Dependency graph recording.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::properties;
use crate::result::TaskResult;
use crate::task::Task;

/// Records every dependency declaration and renders the graph as Graphviz
/// source.
///
/// Keep a clone of the recorder, hand the other to the set, run it, then
/// render with [`write_to`](DependGraphviz::write_to) or `to_string()`.
/// Nodes are labeled with their
/// [`properties::with_name`](crate::properties::with_name) name; edges are
/// sorted by label so the output is stable.
///
/// Tasks that never declare a dependency do not appear. A task showing up in
/// its own transitive closure means the set has a cycle, which the engine
/// itself never checks for.
#[derive(Clone, Default)]
pub struct DependGraphviz {
    edges: Arc<Mutex<HashMap<Task, HashSet<Task>>>>,
}

impl DependGraphviz {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the recorded graph as Graphviz source.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{self}")
    }
}

fn label(task: &Task) -> String {
    properties::name(task).unwrap_or_default()
}

impl fmt::Display for DependGraphviz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges = self.edges.lock();

        let mut tasks: Vec<(&Task, &HashSet<Task>)> = edges.iter().collect();
        tasks.sort_by_key(|(task, _)| label(task));

        writeln!(f, "digraph {{")?;
        for (task, dependencies) in tasks {
            let mut labels: Vec<String> = dependencies.iter().map(label).collect();
            labels.sort();

            write!(f, "    \"{}\" -> {{", label(task))?;
            for dependency in labels {
                write!(f, " \"{dependency}\"")?;
            }
            writeln!(f, " }};")?;
        }
        writeln!(f, "}}")
    }
}

#[async_trait]
impl Middleware for DependGraphviz {
    async fn depend(&self, ctx: Context, task: Task, dependency: Task, next: Next) -> TaskResult {
        let result = next.run(ctx).await;
        self.edges.lock().entry(task).or_default().insert(dependency);
        result
    }
}
