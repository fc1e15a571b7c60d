//! Scheduler — owns the task collection and produces the ranked view.
//!
//! Every mutation runs to completion, including a fresh rebuild of the
//! urgency queue, before the call returns. Nothing ranked is cached between
//! calls: scores depend on "now", so each read builds its own queue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Level, debug, enabled, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulerError};
use crate::queue::UrgencyQueue;
use crate::score::score;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};

/// Aggregate counts. `total == completed + pending + in_progress` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub overdue: usize,
}

/// One row of the ranked view, annotated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position in the ranked view.
    pub rank: usize,
    pub score: f64,
    pub overdue: bool,
    pub task: Task,
}

#[derive(Debug, Clone)]
pub struct Scheduler<C: Clock = SystemClock> {
    clock: C,
    // Keyed by monotonic id, so iteration is creation order.
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
}

impl Scheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            tasks: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Validate `draft`, assign id and creation time, and store it.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(self.reject(SchedulerError::MissingTitle));
        }
        let Some(due_date) = draft.due_date else {
            return Err(self.reject(SchedulerError::MissingDueDate));
        };
        if draft.estimated_time < 1 {
            return Err(self.reject(SchedulerError::InvalidEstimate(draft.estimated_time)));
        }

        let now = self.clock.now();
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let task = Task {
            id,
            title: title.to_string(),
            description: draft.description.filter(|d| !d.trim().is_empty()),
            priority: draft.priority,
            due_date,
            status: draft.status.unwrap_or_default(),
            created_at: now,
            estimated_time: draft.estimated_time,
            dependencies: draft.dependencies,
        };

        info!(task_id = %id, priority = %task.priority, due = %task.due_date, "task added");
        self.tasks.insert(id, task.clone());
        self.refresh(now);
        Ok(task)
    }

    /// Merge `patch` over the stored task. Unknown ids are reported, not ignored.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        if !self.tasks.contains_key(&id) {
            return Err(self.reject(SchedulerError::NotFound(id)));
        }
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(self.reject(SchedulerError::MissingTitle));
        }
        if let Some(minutes) = patch.estimated_time.filter(|m| *m < 1) {
            return Err(self.reject(SchedulerError::InvalidEstimate(minutes)));
        }

        let now = self.clock.now();
        let updated = {
            let task = self
                .tasks
                .get_mut(&id)
                .ok_or(SchedulerError::NotFound(id))?;
            patch.apply(task);
            task.clone()
        };

        info!(task_id = %id, status = %updated.status, "task updated");
        self.refresh(now);
        Ok(updated)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        let Some(removed) = self.tasks.remove(&id) else {
            return Err(self.reject(SchedulerError::NotFound(id)));
        };

        info!(task_id = %id, "task deleted");
        self.refresh(self.clock.now());
        Ok(removed)
    }

    /// Move a task one step along pending -> in-progress -> completed.
    ///
    /// A completed task is returned unchanged.
    pub fn advance(&mut self, id: TaskId) -> Result<Task> {
        let current = match self.tasks.get(&id) {
            Some(t) => t.status,
            None => return Err(self.reject(SchedulerError::NotFound(id))),
        };
        match current.next() {
            Some(next) => self.update_task(id, TaskPatch::status(next)),
            None => Ok(self.tasks[&id].clone()),
        }
    }

    /// Fresh urgency queue over every non-completed task, scored at `now`.
    pub fn rebuild(&self, now: DateTime<Utc>) -> UrgencyQueue {
        UrgencyQueue::from_tasks(
            self.tasks.values().filter(|t| !t.is_completed()).cloned(),
            now,
        )
    }

    /// Non-completed tasks, most urgent first.
    pub fn ranked_view(&self) -> Vec<Task> {
        self.ranked_view_at(self.clock.now())
    }

    pub fn ranked_view_at(&self, now: DateTime<Utc>) -> Vec<Task> {
        self.rebuild(now).snapshot_ordered()
    }

    /// The ranked view with rank, score and overdue flag attached.
    pub fn ranked_entries(&self) -> Vec<RankedEntry> {
        self.ranked_entries_at(self.clock.now())
    }

    pub fn ranked_entries_at(&self, now: DateTime<Utc>) -> Vec<RankedEntry> {
        self.ranked_view_at(now)
            .into_iter()
            .enumerate()
            .map(|(i, task)| RankedEntry {
                rank: i + 1,
                score: score(&task, now),
                overdue: task.is_overdue(now),
                task,
            })
            .collect()
    }

    /// Completed tasks in creation order.
    pub fn completed_view(&self) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|t| t.is_completed())
            .cloned()
            .collect()
    }

    /// Every task in creation order.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub fn stats(&self) -> TaskStats {
        self.stats_at(self.clock.now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> TaskStats {
        let mut stats = TaskStats {
            total: self.tasks.len(),
            ..TaskStats::default()
        };
        for t in self.tasks.values() {
            match t.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            if t.is_overdue(now) {
                stats.overdue += 1;
            }
        }
        stats
    }

    /// Logs the post-mutation queue. Reads build their own, so this only
    /// runs with debug logging on.
    fn refresh(&self, now: DateTime<Utc>) {
        if !enabled!(Level::DEBUG) {
            return;
        }
        let queue = self.rebuild(now);
        debug!(
            queued = queue.len(),
            head = ?queue.peek().map(|t| t.id),
            "urgency queue rebuilt"
        );
    }

    fn reject(&self, err: SchedulerError) -> SchedulerError {
        warn!(reason = err.as_label(), "request rejected: {err}");
        err
    }
}
