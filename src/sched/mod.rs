// src/sched/mod.rs

//! HEFT list scheduling.
//!
//! - [`rank`] computes upward ranks, the task priorities.
//! - [`timeline`] tracks per-worker occupied intervals and finds insertion
//!   slots.
//! - [`heft`] places tasks by earliest finish time and emits per-worker
//!   task lists with their routing.

pub mod heft;
pub mod rank;
pub mod timeline;

pub use heft::{schedule, Fetch, Placement, Push, Schedule, ScheduleOptions, WorkItem};
pub use rank::upward_rank;
pub use timeline::{Slot, Timeline};
