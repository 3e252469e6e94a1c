// src/graph/traverse.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::model::{ArgNode, Args, Dependency, Graph, Task, TaskId};

/// Walk an argument tree and call `visit` for every dependency marker.
pub fn visit_dependencies<'a, F>(args: &'a Args, visit: &mut F)
where
    F: FnMut(&'a Dependency),
{
    match args {
        Args::Single(node) => visit_node(node, visit),
        Args::Positional(nodes) => {
            for node in nodes {
                visit_node(node, visit);
            }
        }
        Args::Keyword(entries) => {
            for node in entries.values() {
                visit_node(node, visit);
            }
        }
    }
}

fn visit_node<'a, F>(node: &'a ArgNode, visit: &mut F)
where
    F: FnMut(&'a Dependency),
{
    match node {
        ArgNode::Value(_) => {}
        ArgNode::Dep(dep) => visit(dep),
        ArgNode::List(items) => {
            for item in items {
                visit_node(item, visit);
            }
        }
        ArgNode::Map(entries) => {
            for item in entries.values() {
                visit_node(item, visit);
            }
        }
    }
}

/// The distinct producers a task depends on, in ID order.
pub fn dependencies_of(task: &Task) -> Vec<TaskId> {
    let mut producers = BTreeSet::new();
    visit_dependencies(&task.args, &mut |dep| {
        producers.insert(dep.task.clone());
    });
    producers.into_iter().collect()
}

/// Estimated communication cost toward each producer.
///
/// A task that references the same producer more than once pays the edge at
/// most once, at the largest declared cost.
pub fn communication_costs_of(task: &Task) -> BTreeMap<TaskId, f64> {
    let mut costs: BTreeMap<TaskId, f64> = BTreeMap::new();
    visit_dependencies(&task.args, &mut |dep| {
        let entry = costs.entry(dep.task.clone()).or_insert(dep.cost);
        if dep.cost > *entry {
            *entry = dep.cost;
        }
    });
    costs
}

/// For each task, the tasks that consume its result.
pub fn successor_map(graph: &Graph) -> BTreeMap<TaskId, Vec<TaskId>> {
    let mut successors: BTreeMap<TaskId, Vec<TaskId>> = graph
        .keys()
        .map(|id| (id.clone(), Vec::new()))
        .collect();
    for (id, task) in graph {
        for producer in dependencies_of(task) {
            if let Some(consumers) = successors.get_mut(&producer) {
                consumers.push(id.clone());
            }
        }
    }
    successors
}

/// For each task, the producers it consumes.
pub fn predecessor_map(graph: &Graph) -> BTreeMap<TaskId, Vec<TaskId>> {
    graph
        .iter()
        .map(|(id, task)| (id.clone(), dependencies_of(task)))
        .collect()
}

/// Deterministic topological order: Kahn's algorithm, always taking the
/// smallest ready ID first. Assumes the graph has already been validated
/// as acyclic; on a cyclic graph the returned order is truncated.
pub fn topological_order(graph: &Graph) -> Vec<TaskId> {
    let successors = successor_map(graph);
    let mut pending: BTreeMap<TaskId, usize> = graph
        .iter()
        .map(|(id, task)| {
            let count = dependencies_of(task)
                .iter()
                .filter(|producer| graph.contains_key(producer))
                .count();
            (id.clone(), count)
        })
        .collect();

    let mut ready: BTreeSet<TaskId> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| id.clone())
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(&next);
        for consumer in &successors[&next] {
            if let Some(count) = pending.get_mut(consumer) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(consumer.clone());
                }
            }
        }
        order.push(next);
    }
    order
}

/// Rewrite every dependency marker in an argument tree.
pub fn map_dependencies<F>(args: &Args, rewrite: &F) -> Args
where
    F: Fn(&Dependency) -> Dependency,
{
    match args {
        Args::Single(node) => Args::Single(map_node(node, rewrite)),
        Args::Positional(nodes) => {
            Args::Positional(nodes.iter().map(|node| map_node(node, rewrite)).collect())
        }
        Args::Keyword(entries) => Args::Keyword(
            entries
                .iter()
                .map(|(name, node)| (name.clone(), map_node(node, rewrite)))
                .collect(),
        ),
    }
}

fn map_node<F>(node: &ArgNode, rewrite: &F) -> ArgNode
where
    F: Fn(&Dependency) -> Dependency,
{
    match node {
        ArgNode::Value(value) => ArgNode::Value(value.clone()),
        ArgNode::Dep(dep) => ArgNode::Dep(rewrite(dep)),
        ArgNode::List(items) => {
            ArgNode::List(items.iter().map(|item| map_node(item, rewrite)).collect())
        }
        ArgNode::Map(entries) => ArgNode::Map(
            entries
                .iter()
                .map(|(name, item)| (name.clone(), map_node(item, rewrite)))
                .collect(),
        ),
    }
}

/// Point dependency markers at replacement producers; markers whose producer
/// is not in `labels` are left alone. Extraction keys and cost estimates are
/// preserved.
pub fn relabel_dependencies(args: &Args, labels: &BTreeMap<TaskId, TaskId>) -> Args {
    map_dependencies(args, &|dep| match labels.get(&dep.task) {
        Some(replacement) => Dependency {
            task: replacement.clone(),
            key: dep.key.clone(),
            cost: dep.cost,
        },
        None => dep.clone(),
    })
}
