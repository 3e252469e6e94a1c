// src/graph/mod.rs

//! Computation graph model and structural rewrites.
//!
//! - [`model`] holds the task, dependency and value types.
//! - [`traverse`] derives edges from argument trees and orders tasks.
//! - [`validate`] runs the scheduling-time sanity checks.
//! - [`dedup`] collapses structurally duplicate tasks.
//! - [`compose`] prefixes IDs so independent graphs can be merged.
//! - [`dot`] exports a graph for visualization.

pub mod compose;
pub mod dedup;
pub mod dot;
pub mod model;
pub mod traverse;
pub mod validate;

pub use compose::prefix;
pub use dedup::remove_duplicates;
pub use dot::to_dot;
pub use model::{
    task_fn, ArgNode, Args, CallArgs, Dependency, Graph, Key, KeyPath, Task, TaskFn, TaskId, Value,
};
pub use validate::validate_graph;
