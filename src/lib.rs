// src/lib.rs

//! Schedule a cost-annotated DAG of tasks across a fixed pool of parallel
//! workers (insertion-based HEFT) and execute it, streaming dependency
//! values between workers through bounded channels.

pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod sched;

pub use errors::{ExecuteError, Failure, FailureKind, ScheduleError, TaskResult};
pub use exec::{execute, inflate, ExecuteOptions, Output, ResultTree, TaskCosts};
pub use graph::{
    prefix, remove_duplicates, task_fn, to_dot, ArgNode, Args, CallArgs, Dependency, Graph, Key,
    KeyPath, Task, TaskFn, TaskId, Value,
};
pub use sched::{schedule, Schedule, ScheduleOptions, WorkItem};
