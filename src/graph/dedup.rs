// src/graph/dedup.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::graph::model::{Graph, Task, TaskId};
use crate::graph::traverse::{relabel_dependencies, topological_order};

/// Collapse structurally duplicate tasks into a single survivor each.
///
/// Two tasks are duplicates when they hold the same function (by identity)
/// and equivalent argument trees after every dependency marker has been
/// resolved through earlier merges; chains of duplicates therefore collapse
/// transitively. Tasks are canonicalized in topological order, so a task's
/// producers are always resolved before the task itself is compared.
///
/// Returns the reduced graph (a subset of the input keys, with dependencies
/// rewritten to point at survivors) and the alias map sending each
/// eliminated ID to its survivor. The first-encountered task of a duplicate
/// class survives and keeps its compute-cost estimate.
pub fn remove_duplicates(graph: &Graph) -> (Graph, BTreeMap<TaskId, TaskId>) {
    let mut reduced: Graph = BTreeMap::new();
    let mut aliases: BTreeMap<TaskId, TaskId> = BTreeMap::new();
    let mut survivors: Vec<TaskId> = Vec::new();

    for id in topological_order(graph) {
        let task = &graph[&id];
        let args = relabel_dependencies(&task.args, &aliases);

        let existing = survivors
            .iter()
            .find(|survivor| {
                let kept = &reduced[*survivor];
                crate::graph::model::same_func(&kept.func, &task.func) && kept.args == args
            })
            .cloned();

        match existing {
            Some(survivor) => {
                debug!(task = %id, survivor = %survivor, "eliminating duplicate task");
                aliases.insert(id, survivor);
            }
            None => {
                survivors.push(id.clone());
                reduced.insert(id, Task::new(task.func.clone(), args, task.cost));
            }
        }
    }

    (reduced, aliases)
}
