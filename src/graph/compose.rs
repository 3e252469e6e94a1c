// src/graph/compose.rs

use crate::graph::model::{Dependency, Graph, Task, TaskId};
use crate::graph::traverse::map_dependencies;

/// Rewrite every task ID in a graph to the structured ID `(token, id)`,
/// including the IDs referenced by dependency markers.
///
/// Prefixing two independent graphs with distinct tokens makes their key
/// sets disjoint, so they can be merged into one graph and scheduled
/// together.
pub fn prefix(graph: &Graph, token: &TaskId) -> Graph {
    graph
        .iter()
        .map(|(id, task)| {
            let args = map_dependencies(&task.args, &|dep| Dependency {
                task: dep.task.prefixed(token),
                key: dep.key.clone(),
                cost: dep.cost,
            });
            (
                id.prefixed(token),
                Task::new(task.func.clone(), args, task.cost),
            )
        })
        .collect()
}
