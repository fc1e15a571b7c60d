//! Thread-safe handle for hosts with more than one caller.
//!
//! One lock guards the whole collection and is held for a full
//! mutate-and-rebuild cycle. Validation runs before any mutation, so a
//! poisoned lock never hides half-applied state and is simply recovered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::scheduler::{RankedEntry, Scheduler, TaskStats};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};

#[derive(Debug)]
pub struct SharedScheduler<C: Clock = SystemClock> {
    inner: Arc<Mutex<Scheduler<C>>>,
}

impl<C: Clock> Clone for SharedScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SharedScheduler<C> {
    pub fn new(scheduler: Scheduler<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    /// Run `f` with exclusive access for its whole duration.
    pub fn with<R>(&self, f: impl FnOnce(&mut Scheduler<C>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn add_task(&self, draft: TaskDraft) -> Result<Task> {
        self.lock().add_task(draft)
    }

    pub fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        self.lock().update_task(id, patch)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<Task> {
        self.lock().delete_task(id)
    }

    pub fn advance(&self, id: TaskId) -> Result<Task> {
        self.lock().advance(id)
    }

    pub fn ranked_view(&self) -> Vec<Task> {
        self.lock().ranked_view()
    }

    pub fn ranked_entries(&self) -> Vec<RankedEntry> {
        self.lock().ranked_entries()
    }

    pub fn completed_view(&self) -> Vec<Task> {
        self.lock().completed_view()
    }

    pub fn stats(&self) -> TaskStats {
        self.lock().stats()
    }

    fn lock(&self) -> MutexGuard<'_, Scheduler<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Scheduler<SystemClock>> for SharedScheduler<SystemClock> {
    fn from(scheduler: Scheduler<SystemClock>) -> Self {
        Self::new(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::thread;

    #[test]
    fn concurrent_adds_get_unique_ids() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let shared = SharedScheduler::new(Scheduler::with_clock(FixedClock::new(now)));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = shared.clone();
                thread::spawn(move || {
                    (0..10)
                        .map(|j| {
                            let draft = TaskDraft::new(format!("t{i}-{j}"))
                                .with_due(now + Duration::days(1));
                            s.add_task(draft).unwrap().id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<TaskId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 80);
        assert_eq!(shared.stats().total, 80);
        assert_eq!(shared.with(|s| s.len()), 80);
    }
}
