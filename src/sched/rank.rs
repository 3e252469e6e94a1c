// src/sched/rank.rs

use std::collections::BTreeMap;

use crate::graph::model::{Graph, TaskId};
use crate::graph::traverse::{communication_costs_of, successor_map, topological_order};

/// Compute the upward rank of every task.
///
/// `rank(t) = cost(t) + max over consumers c of (comm(t -> c) + rank(c))`,
/// with leaves ranked at their compute cost alone. Ranks are the HEFT
/// priority: higher ranks schedule first.
pub fn upward_rank(graph: &Graph) -> BTreeMap<TaskId, f64> {
    let successors = successor_map(graph);
    let comm: BTreeMap<TaskId, BTreeMap<TaskId, f64>> = graph
        .iter()
        .map(|(id, task)| (id.clone(), communication_costs_of(task)))
        .collect();

    let mut ranks: BTreeMap<TaskId, f64> = BTreeMap::new();
    for id in topological_order(graph).into_iter().rev() {
        let mut heaviest = 0.0_f64;
        for consumer in &successors[&id] {
            let edge = comm
                .get(consumer)
                .and_then(|costs| costs.get(&id))
                .copied()
                .unwrap_or(0.0);
            let downstream = edge + ranks.get(consumer).copied().unwrap_or(0.0);
            if downstream > heaviest {
                heaviest = downstream;
            }
        }
        let cost = graph.get(&id).map(|task| task.cost).unwrap_or(0.0);
        ranks.insert(id, cost + heaviest);
    }
    ranks
}
