// src/exec/collect.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::TaskResult;
use crate::exec::worker::WorkerReport;
use crate::graph::model::TaskId;

/// Measured costs of one task: wall-clock compute time and, per fetched
/// cross-worker dependency, the observed receive latency. Seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCosts {
    pub compute: f64,
    pub communication: Vec<(TaskId, f64)>,
}

/// Result mapping returned to the caller. A flat map is a `Branch` whose
/// children are all leaves; inflation nests structured IDs level by level.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultTree {
    Leaf(TaskResult),
    Branch(BTreeMap<TaskId, ResultTree>),
}

impl ResultTree {
    pub fn get(&self, id: &TaskId) -> Option<&ResultTree> {
        match self {
            ResultTree::Branch(entries) => entries.get(id),
            ResultTree::Leaf(_) => None,
        }
    }

    pub fn as_result(&self) -> Option<&TaskResult> {
        match self {
            ResultTree::Leaf(result) => Some(result),
            ResultTree::Branch(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResultTree::Leaf(_) => 1,
            ResultTree::Branch(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ResultTree::Leaf(_) => false,
            ResultTree::Branch(entries) => entries.is_empty(),
        }
    }

    /// Rebuild the flat map, joining nested keys back into structured IDs.
    /// Inverse of [`inflate`] for structured keys of length two and more.
    pub fn flatten(&self) -> BTreeMap<TaskId, TaskResult> {
        let mut flat = BTreeMap::new();
        if let ResultTree::Branch(entries) = self {
            for (key, child) in entries {
                flatten_into(key, child, &mut flat);
            }
        }
        flat
    }
}

fn flatten_into(key: &TaskId, tree: &ResultTree, flat: &mut BTreeMap<TaskId, TaskResult>) {
    match tree {
        ResultTree::Leaf(result) => {
            flat.insert(key.clone(), result.clone());
        }
        ResultTree::Branch(entries) => {
            for (part, child) in entries {
                flatten_into(&join_keys(key, part), child, flat);
            }
        }
    }
}

fn join_keys(outer: &TaskId, inner: &TaskId) -> TaskId {
    let mut parts = match outer {
        TaskId::Path(parts) => parts.clone(),
        other => vec![other.clone()],
    };
    match inner {
        TaskId::Path(inner_parts) => parts.extend(inner_parts.iter().cloned()),
        other => parts.push(other.clone()),
    }
    TaskId::Path(parts)
}

/// What `execute` hands back: the result mapping keyed by original task IDs
/// and, when requested, the measured costs under the same keys.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub results: ResultTree,
    pub costs: Option<BTreeMap<TaskId, TaskCosts>>,
}

impl Output {
    /// Convenience lookup for non-inflated results.
    pub fn result(&self, id: &TaskId) -> Option<&TaskResult> {
        self.results.get(id).and_then(ResultTree::as_result)
    }
}

/// Turn a flat result map into a nested one: every structured (`Path`) key
/// of length n becomes n levels of nesting; other keys stay top-level.
/// Order-independent, and no key is dropped.
pub fn inflate(flat: BTreeMap<TaskId, TaskResult>) -> ResultTree {
    let mut root: BTreeMap<TaskId, ResultTree> = BTreeMap::new();
    for (id, result) in flat {
        match id {
            TaskId::Path(parts) if !parts.is_empty() => insert_path(&mut root, &parts, result),
            other => {
                root.insert(other, ResultTree::Leaf(result));
            }
        }
    }
    ResultTree::Branch(root)
}

fn insert_path(level: &mut BTreeMap<TaskId, ResultTree>, parts: &[TaskId], result: TaskResult) {
    match parts {
        [] => {}
        [last] => {
            level.insert(last.clone(), ResultTree::Leaf(result));
        }
        [first, rest @ ..] => {
            let child = level
                .entry(first.clone())
                .or_insert_with(|| ResultTree::Branch(BTreeMap::new()));
            match child {
                ResultTree::Branch(entries) => insert_path(entries, rest, result),
                other => {
                    let mut entries = BTreeMap::new();
                    insert_path(&mut entries, rest, result);
                    *other = ResultTree::Branch(entries);
                }
            }
        }
    }
}

/// Merge worker reports into the client-facing output, attributing each
/// item's result (and costs) to every ID in its report list.
pub(crate) fn collect_output(
    reports: Vec<WorkerReport>,
    report_ids: &[Vec<Vec<TaskId>>],
    with_costs: bool,
    inflate_keys: bool,
) -> Output {
    let mut flat: BTreeMap<TaskId, TaskResult> = BTreeMap::new();
    let mut costs: BTreeMap<TaskId, TaskCosts> = BTreeMap::new();

    for report in reports {
        let ids = report_ids
            .get(report.index)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for (k, (result, cost)) in report.outcomes.into_iter().enumerate() {
            let Some(ids_k) = ids.get(k) else { continue };
            for id in ids_k {
                flat.insert(id.clone(), result.clone());
                if with_costs {
                    costs.insert(id.clone(), cost.clone());
                }
            }
        }
    }

    let results = if inflate_keys {
        inflate(flat)
    } else {
        ResultTree::Branch(
            flat.into_iter()
                .map(|(id, result)| (id, ResultTree::Leaf(result)))
                .collect(),
        )
    };

    Output {
        results,
        costs: with_costs.then_some(costs),
    }
}
