// src/sched/timeline.rs

use crate::graph::model::TaskId;

/// An occupied interval in a single worker's schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub task: TaskId,
    pub start: f64,
    pub finish: f64,
}

/// A single worker's schedule: occupied intervals sorted by start time.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    slots: Vec<Slot>,
}

impl Timeline {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Occupied intervals in start order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Earliest start time at or after `ready` where an idle gap of at least
    /// `length` fits: the insertion search between consecutive occupied
    /// intervals, falling back to the end of the schedule.
    pub fn earliest_fit(&self, ready: f64, length: f64) -> f64 {
        let mut cursor = 0.0_f64;
        for slot in &self.slots {
            let candidate = cursor.max(ready);
            if candidate + length <= slot.start {
                return candidate;
            }
            cursor = slot.finish;
        }
        cursor.max(ready)
    }

    /// Insert a slot, keeping the sequence sorted. The caller is expected to
    /// have picked the interval via [`earliest_fit`](Self::earliest_fit), so
    /// it never overlaps an occupied one.
    pub fn insert(&mut self, slot: Slot) {
        let at = self
            .slots
            .iter()
            .position(|occupied| slot.finish <= occupied.start)
            .unwrap_or(self.slots.len());
        self.slots.insert(at, slot);
    }

    pub fn finish_of(&self, task: &TaskId) -> Option<f64> {
        self.slots
            .iter()
            .find(|slot| &slot.task == task)
            .map(|slot| slot.finish)
    }
}
