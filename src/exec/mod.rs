// src/exec/mod.rs

//! Dispatch and worker runtime.
//!
//! - [`dispatch`] owns `execute`: it spawns one blocking worker per task
//!   list, wires the inter-worker channels, and drains results under the
//!   collection deadline.
//! - [`worker`] is the sequential per-worker loop: fetch remote
//!   dependencies, materialize arguments, invoke, forward results.
//! - [`collect`] merges worker reports into the client-facing result
//!   mapping, including structured-ID inflation.

pub mod collect;
pub mod dispatch;
pub(crate) mod worker;

pub use collect::{inflate, Output, ResultTree, TaskCosts};
pub use dispatch::{execute, ExecuteOptions};
