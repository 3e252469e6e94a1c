// src/errors.rs

//! Failure sentinels carried through the result map, plus the fatal error
//! enums raised by `schedule` and `execute`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::model::{TaskId, Value};

/// Classification of a per-task failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The task's own function returned an error or panicked.
    Task,
    /// At least one upstream dependency produced a failure.
    Dependency,
    /// A dependency read did not complete in time.
    Timeout,
}

/// A captured per-task failure. Cloneable so it can travel through result
/// channels and fan out to every downstream consumer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn task(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Task,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: message.into(),
        }
    }

    /// The failure recorded for a task whose dependency failed. Downstream
    /// of downstream keeps the root message instead of nesting wrappers.
    pub fn dependency(upstream: &Failure) -> Self {
        let message = match upstream.kind {
            FailureKind::Dependency => upstream.message.clone(),
            _ => format!("a dependency failed with: {}", upstream.message),
        };
        Self {
            kind: FailureKind::Dependency,
            message,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Task => write!(f, "task failure: {}", self.message),
            FailureKind::Dependency => write!(f, "dependency failure: {}", self.message),
            FailureKind::Timeout => write!(f, "timeout: {}", self.message),
        }
    }
}

/// Outcome of a single task: a value or a failure sentinel. This is what
/// travels over inter-worker channels and what the final result map holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TaskResult {
    Ok(Value),
    Err(Failure),
}

impl TaskResult {
    pub fn is_err(&self) -> bool {
        matches!(self, TaskResult::Err(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            TaskResult::Ok(value) => Some(value),
            TaskResult::Err(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            TaskResult::Ok(_) => None,
            TaskResult::Err(failure) => Some(failure),
        }
    }
}

/// Fatal configuration errors raised synchronously from `schedule`.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },
    #[error("task {task} has a non-finite or negative computation cost")]
    InvalidComputationCost { task: TaskId },
    #[error("task {task} has a non-finite or negative communication cost toward {dependency}")]
    InvalidCommunicationCost { task: TaskId, dependency: TaskId },
    #[error("cycle detected in task graph involving {task}")]
    Cycle { task: TaskId },
}

/// Fatal errors raised from `execute`.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("timed out after {timeout:?} collecting results from worker {worker}")]
    CollectionTimeout { worker: usize, timeout: Duration },
    #[error("worker {worker} exited without delivering results")]
    WorkerLost { worker: usize },
}
