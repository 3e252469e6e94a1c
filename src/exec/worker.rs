// src/exec/worker.rs

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::{Failure, TaskResult};
use crate::exec::collect::TaskCosts;
use crate::graph::model::{ArgNode, Args, CallArgs, TaskId, Value};
use crate::sched::heft::WorkItem;

/// Everything one worker needs: its task list, the endpoints of the
/// channels it reads and writes, and the shared cancellation flag.
pub(crate) struct WorkerContext {
    pub index: usize,
    pub items: Vec<WorkItem>,
    pub senders: HashMap<usize, SyncSender<TaskResult>>,
    pub receivers: HashMap<usize, Receiver<TaskResult>>,
    pub per_read_timeout: Option<Duration>,
    pub cancel: Arc<AtomicBool>,
}

/// Per-item outcomes in task-list order, delivered back to the dispatcher.
pub(crate) struct WorkerReport {
    pub index: usize,
    pub outcomes: Vec<(TaskResult, TaskCosts)>,
}

/// Execute a task list sequentially, resolving dependencies from the
/// worker-local result map or from inter-worker channels.
pub(crate) fn run_worker(ctx: WorkerContext) -> WorkerReport {
    let mut resolved: BTreeMap<TaskId, TaskResult> = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(ctx.items.len());

    for item in &ctx.items {
        if ctx.cancel.load(Ordering::Relaxed) {
            debug!(worker = ctx.index, "cancellation requested, stopping task list");
            break;
        }

        let mut costs = TaskCosts::default();
        let mut read_failure: Option<Failure> = None;

        for fetch in &item.fetches {
            let waited = Instant::now();
            match receive(&ctx, fetch.channel, &fetch.producer) {
                Ok(result) => {
                    costs
                        .communication
                        .push((fetch.producer.clone(), waited.elapsed().as_secs_f64()));
                    resolved.insert(fetch.producer.clone(), result);
                }
                Err(failure) => {
                    warn!(
                        worker = ctx.index,
                        task = %item.task,
                        producer = %fetch.producer,
                        "dependency read failed: {}",
                        failure.message
                    );
                    read_failure = Some(failure);
                    break;
                }
            }
        }

        let started = Instant::now();
        let result = match read_failure {
            Some(failure) => TaskResult::Err(failure),
            None => run_item(item, &resolved),
        };
        costs.compute = started.elapsed().as_secs_f64();

        if let TaskResult::Err(failure) = &result {
            debug!(worker = ctx.index, task = %item.task, "task failed: {failure}");
        }

        for push in &item.pushes {
            let delivered = match ctx.senders.get(&push.channel) {
                Some(tx) => tx.send(result.clone()).is_ok(),
                None => false,
            };
            if !delivered {
                warn!(
                    worker = ctx.index,
                    task = %item.task,
                    consumer = push.consumer,
                    "could not forward result to consumer worker"
                );
            }
        }

        resolved.insert(item.task.clone(), result.clone());
        outcomes.push((result, costs));
    }

    WorkerReport {
        index: ctx.index,
        outcomes,
    }
}

/// Blocking read of one cross-worker dependency value.
fn receive(ctx: &WorkerContext, channel: usize, producer: &TaskId) -> Result<TaskResult, Failure> {
    let Some(rx) = ctx.receivers.get(&channel) else {
        return Err(Failure::task(format!(
            "no channel wired for the result of task {producer}"
        )));
    };

    match ctx.per_read_timeout {
        Some(timeout) => rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => Failure::timeout(format!(
                "timed out after {timeout:?} waiting for the result of task {producer}"
            )),
            RecvTimeoutError::Disconnected => Failure::timeout(format!(
                "producer of task {producer} went away before sending a result"
            )),
        }),
        None => rx.recv().map_err(|_| {
            Failure::timeout(format!(
                "producer of task {producer} went away before sending a result"
            ))
        }),
    }
}

/// Materialize arguments and invoke the task function, capturing returned
/// errors and panics alike.
fn run_item(item: &WorkItem, resolved: &BTreeMap<TaskId, TaskResult>) -> TaskResult {
    let call_args = match materialize(&item.args, resolved) {
        Ok(args) => args,
        Err(failure) => return TaskResult::Err(failure),
    };

    match catch_unwind(AssertUnwindSafe(|| (item.func)(call_args))) {
        Ok(Ok(value)) => TaskResult::Ok(value),
        Ok(Err(err)) => TaskResult::Err(Failure::task(format!("{err:#}"))),
        Err(panic) => TaskResult::Err(Failure::task(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}

/// Replace every dependency marker with the producer's (extracted) value.
fn materialize(
    args: &Args,
    resolved: &BTreeMap<TaskId, TaskResult>,
) -> Result<CallArgs, Failure> {
    Ok(match args {
        Args::Single(node) => CallArgs::Single(materialize_node(node, resolved)?),
        Args::Positional(nodes) => CallArgs::Positional(
            nodes
                .iter()
                .map(|node| materialize_node(node, resolved))
                .collect::<Result<Vec<Value>, Failure>>()?,
        ),
        Args::Keyword(entries) => CallArgs::Keyword(
            entries
                .iter()
                .map(|(name, node)| Ok((name.clone(), materialize_node(node, resolved)?)))
                .collect::<Result<BTreeMap<String, Value>, Failure>>()?,
        ),
    })
}

fn materialize_node(
    node: &ArgNode,
    resolved: &BTreeMap<TaskId, TaskResult>,
) -> Result<Value, Failure> {
    match node {
        ArgNode::Value(value) => Ok(value.clone()),
        ArgNode::Dep(dep) => {
            let result = resolved.get(&dep.task).ok_or_else(|| {
                Failure::task(format!(
                    "result of task {} is not available on this worker",
                    dep.task
                ))
            })?;
            match result {
                TaskResult::Err(failure) => Err(Failure::dependency(failure)),
                TaskResult::Ok(value) => value.extract(&dep.key).cloned().ok_or_else(|| {
                    Failure::task(format!(
                        "no value at {} in the result of task {}",
                        dep.key, dep.task
                    ))
                }),
            }
        }
        ArgNode::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| materialize_node(item, resolved))
                .collect::<Result<Vec<Value>, Failure>>()?,
        )),
        ArgNode::Map(entries) => Ok(Value::Map(
            entries
                .iter()
                .map(|(name, item)| Ok((name.clone(), materialize_node(item, resolved)?)))
                .collect::<Result<BTreeMap<String, Value>, Failure>>()?,
        )),
    }
}
