// src/sched/heft.rs

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::ScheduleError;
use crate::graph::dedup::remove_duplicates;
use crate::graph::model::{Args, Graph, TaskFn, TaskId};
use crate::graph::traverse::{communication_costs_of, predecessor_map, topological_order};
use crate::graph::validate::validate_graph;
use crate::sched::rank::upward_rank;
use crate::sched::timeline::{Slot, Timeline};

/// Options for [`schedule`].
#[derive(Clone, Debug, Default)]
pub struct ScheduleOptions {
    /// Restrict which task IDs the final result map reports. Every task is
    /// still scheduled and executed; only reporting is filtered.
    pub output_tasks: Option<Vec<TaskId>>,
    /// Maximum wait for one cross-worker dependency value at execution time.
    /// `None` waits indefinitely.
    pub per_read_timeout: Option<Duration>,
}

/// Where and when a task was placed.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub worker: usize,
    pub start: f64,
    pub finish: f64,
}

/// Pull the result of `producer` from another worker before running.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetch {
    pub producer: TaskId,
    pub channel: usize,
}

/// Forward this task's result to a consumer on worker `consumer`.
#[derive(Clone, Debug, PartialEq)]
pub struct Push {
    pub channel: usize,
    pub consumer: usize,
}

/// One entry of a worker's task list: the task itself plus its routing.
///
/// `fetches` are performed in order before the argument tree is
/// materialized; `pushes` are performed right after the task finishes,
/// whether it produced a value or a failure.
#[derive(Clone)]
pub struct WorkItem {
    pub task: TaskId,
    pub func: TaskFn,
    pub args: Args,
    pub cost: f64,
    pub fetches: Vec<Fetch>,
    pub pushes: Vec<Push>,
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("task", &self.task)
            .field("args", &self.args)
            .field("cost", &self.cost)
            .field("fetches", &self.fetches)
            .field("pushes", &self.pushes)
            .finish_non_exhaustive()
    }
}

/// Output of [`schedule`]: per-worker ordered task lists with a parallel
/// report-ID structure, plus the channel table for the dispatcher.
#[derive(Clone, Debug)]
pub struct Schedule {
    /// One ordered task list per worker.
    pub work_items: Vec<Vec<WorkItem>>,
    /// Aligned 1:1 with `work_items`: for each item, the original-graph IDs
    /// its result reports under (the surviving ID plus any duplicate
    /// aliases, restricted by the output filter; possibly empty).
    pub report_ids: Vec<Vec<Vec<TaskId>>>,
    /// Placement of every deduplicated task, for inspection and logging.
    pub placements: BTreeMap<TaskId, Placement>,
    /// Number of inter-worker channels the dispatcher must create.
    pub channels: usize,
    pub per_read_timeout: Option<Duration>,
}

/// Partition and order a computation graph across `workers` identical
/// workers, approximately minimizing makespan.
///
/// Duplicate tasks are collapsed first. Priorities are upward ranks;
/// placement is insertion-based earliest-finish-time with communication
/// costs charged only across workers. Output is deterministic for a given
/// graph and worker count: equal ranks keep a deterministic topological
/// order and equal finish times go to the lowest worker index.
pub fn schedule(
    graph: &Graph,
    workers: usize,
    options: ScheduleOptions,
) -> Result<Schedule, ScheduleError> {
    validate_graph(graph, workers)?;

    let (reduced, aliases) = remove_duplicates(graph);
    if !aliases.is_empty() {
        debug!(
            eliminated = aliases.len(),
            remaining = reduced.len(),
            "collapsed duplicate tasks"
        );
    }

    let ranks = upward_rank(&reduced);
    let rank_of = |id: &TaskId| ranks.get(id).copied().unwrap_or(0.0);

    // Stable sort over a deterministic topological order: equal-rank tasks
    // keep dependency order, so every producer is placed before its
    // consumers even when zero costs make ranks tie.
    let mut priority = topological_order(&reduced);
    priority.sort_by(|a, b| {
        rank_of(b)
            .partial_cmp(&rank_of(a))
            .unwrap_or(Ordering::Equal)
    });

    let predecessors = predecessor_map(&reduced);
    let comm: BTreeMap<TaskId, BTreeMap<TaskId, f64>> = reduced
        .iter()
        .map(|(id, task)| (id.clone(), communication_costs_of(task)))
        .collect();

    let mut timelines: Vec<Timeline> = (0..workers).map(|_| Timeline::new()).collect();
    let mut placements: BTreeMap<TaskId, Placement> = BTreeMap::new();

    for id in &priority {
        let cost = reduced[id].cost;

        // (finish, start, worker); strict `<` keeps the lowest worker index
        // on ties.
        let mut best = (f64::INFINITY, 0.0_f64, 0_usize);
        for worker in 0..workers {
            let mut ready = 0.0_f64;
            for producer in &predecessors[id] {
                let Some(placed) = placements.get(producer) else {
                    warn!(task = %id, producer = %producer, "producer not placed yet; ignoring");
                    continue;
                };
                let mut available = placed.finish;
                if placed.worker != worker {
                    available += comm[id].get(producer).copied().unwrap_or(0.0);
                }
                if available > ready {
                    ready = available;
                }
            }
            let start = timelines[worker].earliest_fit(ready, cost);
            let finish = start + cost;
            if finish < best.0 {
                best = (finish, start, worker);
            }
        }

        let (finish, start, worker) = best;
        debug!(task = %id, worker, start, finish, "placed task");
        timelines[worker].insert(Slot {
            task: id.clone(),
            start,
            finish,
        });
        placements.insert(
            id.clone(),
            Placement {
                worker,
                start,
                finish,
            },
        );
    }

    // One dedicated channel per cross-worker dependency edge.
    let mut channels = 0_usize;
    let mut fetches: BTreeMap<TaskId, Vec<Fetch>> = BTreeMap::new();
    let mut pushes: BTreeMap<TaskId, Vec<Push>> = BTreeMap::new();
    for (consumer, producers) in &predecessors {
        for producer in producers {
            let from = placements[producer].worker;
            let to = placements[consumer].worker;
            if from != to {
                fetches.entry(consumer.clone()).or_default().push(Fetch {
                    producer: producer.clone(),
                    channel: channels,
                });
                pushes.entry(producer.clone()).or_default().push(Push {
                    channel: channels,
                    consumer: to,
                });
                channels += 1;
            }
        }
    }

    // Every original ID a surviving task reports under.
    let mut reports: BTreeMap<TaskId, Vec<TaskId>> = reduced
        .keys()
        .map(|id| (id.clone(), vec![id.clone()]))
        .collect();
    for (alias, survivor) in &aliases {
        if let Some(ids) = reports.get_mut(survivor) {
            ids.push(alias.clone());
        }
    }
    for ids in reports.values_mut() {
        ids.sort();
    }
    if let Some(output) = &options.output_tasks {
        let keep: BTreeSet<&TaskId> = output.iter().collect();
        for ids in reports.values_mut() {
            ids.retain(|id| keep.contains(id));
        }
    }

    let mut work_items: Vec<Vec<WorkItem>> = (0..workers).map(|_| Vec::new()).collect();
    let mut report_ids: Vec<Vec<Vec<TaskId>>> = (0..workers).map(|_| Vec::new()).collect();
    for worker in 0..workers {
        for slot in timelines[worker].slots() {
            let task = &reduced[&slot.task];
            work_items[worker].push(WorkItem {
                task: slot.task.clone(),
                func: task.func.clone(),
                args: task.args.clone(),
                cost: task.cost,
                fetches: fetches.remove(&slot.task).unwrap_or_default(),
                pushes: pushes.remove(&slot.task).unwrap_or_default(),
            });
            report_ids[worker].push(reports.get(&slot.task).cloned().unwrap_or_default());
        }
    }

    info!(
        tasks = reduced.len(),
        workers, channels, "schedule complete"
    );

    Ok(Schedule {
        work_items,
        report_ids,
        placements,
        channels,
        per_read_timeout: options.per_read_timeout,
    })
}
