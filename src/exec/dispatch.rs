// src/exec/dispatch.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{ExecuteError, TaskResult};
use crate::exec::collect::{collect_output, Output};
use crate::exec::worker::{run_worker, WorkerContext, WorkerReport};
use crate::sched::heft::Schedule;

/// Options for [`execute`].
#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    /// Overall deadline for draining results from all workers.
    pub collection_timeout: Duration,
    /// Measure actual compute and communication times and attach them to
    /// the output.
    pub costs: bool,
    /// Inflate structured (`Path`) IDs into nested result mappings.
    pub inflate: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            collection_timeout: Duration::from_secs(60),
            costs: false,
            inflate: false,
        }
    }
}

/// Run a schedule to completion: one blocking worker thread per task list,
/// one rendezvous channel per cross-worker dependency edge, results drained
/// under the collection deadline.
///
/// Per-task failures stay inside the result map; only a missed collection
/// deadline or a lost worker fails the whole call. On such a failure the
/// remaining workers are asked to stop between work items (best effort).
pub async fn execute(schedule: Schedule, options: ExecuteOptions) -> Result<Output, ExecuteError> {
    let workers = schedule.work_items.len();
    info!(workers, channels = schedule.channels, "starting execution");

    let mut channel_senders: Vec<Option<SyncSender<TaskResult>>> =
        Vec::with_capacity(schedule.channels);
    let mut channel_receivers: Vec<Option<Receiver<TaskResult>>> =
        Vec::with_capacity(schedule.channels);
    for _ in 0..schedule.channels {
        let (tx, rx) = mpsc::sync_channel(1);
        channel_senders.push(Some(tx));
        channel_receivers.push(Some(rx));
    }

    let Schedule {
        work_items,
        report_ids,
        per_read_timeout,
        ..
    } = schedule;

    let cancel = Arc::new(AtomicBool::new(false));
    let mut handles: Vec<JoinHandle<WorkerReport>> = Vec::with_capacity(workers);

    for (index, items) in work_items.into_iter().enumerate() {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for item in &items {
            for push in &item.pushes {
                if let Some(tx) = channel_senders.get_mut(push.channel).and_then(Option::take) {
                    senders.insert(push.channel, tx);
                }
            }
            for fetch in &item.fetches {
                if let Some(rx) = channel_receivers.get_mut(fetch.channel).and_then(Option::take) {
                    receivers.insert(fetch.channel, rx);
                }
            }
        }

        let ctx = WorkerContext {
            index,
            items,
            senders,
            receivers,
            per_read_timeout,
            cancel: Arc::clone(&cancel),
        };
        handles.push(tokio::task::spawn_blocking(move || run_worker(ctx)));
    }

    // Endpoints that no worker claimed drop here; a read on such a channel
    // reports a disconnect instead of blocking forever.
    drop(channel_senders);
    drop(channel_receivers);

    let deadline = tokio::time::Instant::now() + options.collection_timeout;
    let mut reports: Vec<WorkerReport> = Vec::with_capacity(workers);

    for (index, handle) in handles.into_iter().enumerate() {
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(report)) => {
                debug!(
                    worker = index,
                    tasks = report.outcomes.len(),
                    "worker delivered results"
                );
                reports.push(report);
            }
            Ok(Err(join_error)) => {
                warn!(worker = index, error = %join_error, "worker thread was lost");
                cancel.store(true, Ordering::Relaxed);
                return Err(ExecuteError::WorkerLost { worker: index });
            }
            Err(_elapsed) => {
                warn!(
                    worker = index,
                    "collection deadline elapsed, cancelling remaining workers"
                );
                cancel.store(true, Ordering::Relaxed);
                return Err(ExecuteError::CollectionTimeout {
                    worker: index,
                    timeout: options.collection_timeout,
                });
            }
        }
    }

    info!("all workers delivered results");
    Ok(collect_output(
        reports,
        &report_ids,
        options.costs,
        options.inflate,
    ))
}
