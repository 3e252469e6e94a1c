// src/graph/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::errors::ScheduleError;
use crate::graph::model::{Graph, TaskId};
use crate::graph::traverse::{communication_costs_of, dependencies_of};

/// Run scheduling-time validation against a computation graph.
///
/// This checks:
/// - `workers >= 1`
/// - every dependency marker references a task present in the graph
/// - all computation and communication costs are finite and non-negative
/// - the dependency graph has no cycles
///
/// Argument shapes need no check here; the `Args` sum type makes malformed
/// shapes unrepresentable.
pub fn validate_graph(graph: &Graph, workers: usize) -> Result<(), ScheduleError> {
    ensure_workers(workers)?;
    validate_dependencies(graph)?;
    validate_costs(graph)?;
    validate_acyclic(graph)?;
    Ok(())
}

fn ensure_workers(workers: usize) -> Result<(), ScheduleError> {
    if workers == 0 {
        return Err(ScheduleError::NoWorkers);
    }
    Ok(())
}

fn validate_dependencies(graph: &Graph) -> Result<(), ScheduleError> {
    for (id, task) in graph {
        for producer in dependencies_of(task) {
            if !graph.contains_key(&producer) {
                return Err(ScheduleError::UnknownDependency {
                    task: id.clone(),
                    dependency: producer,
                });
            }
        }
    }
    Ok(())
}

fn validate_costs(graph: &Graph) -> Result<(), ScheduleError> {
    for (id, task) in graph {
        if !task.cost.is_finite() || task.cost < 0.0 {
            return Err(ScheduleError::InvalidComputationCost { task: id.clone() });
        }
        for (producer, cost) in communication_costs_of(task) {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ScheduleError::InvalidCommunicationCost {
                    task: id.clone(),
                    dependency: producer,
                });
            }
        }
    }
    Ok(())
}

fn validate_acyclic(graph: &Graph) -> Result<(), ScheduleError> {
    // Edge direction: producer -> consumer.
    let mut dag: DiGraph<TaskId, ()> = DiGraph::new();
    let mut indices = BTreeMap::new();

    for id in graph.keys() {
        indices.insert(id.clone(), dag.add_node(id.clone()));
    }
    for (id, task) in graph {
        for producer in dependencies_of(task) {
            if let (Some(&from), Some(&to)) = (indices.get(&producer), indices.get(id)) {
                dag.add_edge(from, to, ());
            }
        }
    }

    // A topological sort fails exactly when there is a cycle.
    match toposort(&dag, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ScheduleError::Cycle {
            task: dag[cycle.node_id()].clone(),
        }),
    }
}
