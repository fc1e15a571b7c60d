//! Urgency scoring.
//!
//! `score = weight(priority) * 10 + 10 / max(1, days_to_due)`
//!
//! The tier term dominates: an overdue low task tops out at 20 while a
//! far-future high task sits just above 30. Within a tier the nearer
//! deadline wins. Overdue tasks clamp to one day so the boost stays at +10.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::task::Task;

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Floor for the deadline denominator, in days.
pub const MIN_DAYS_TO_DUE: f64 = 1.0;

/// Days between `now` and the due date, clamped to [`MIN_DAYS_TO_DUE`].
pub fn days_to_due(task: &Task, now: DateTime<Utc>) -> f64 {
    let millis = (task.due_date - now).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).max(MIN_DAYS_TO_DUE)
}

/// Pure urgency score for `task` at `now`. Higher is more urgent.
pub fn score(task: &Task, now: DateTime<Utc>) -> f64 {
    task.priority.weight() * 10.0 + 10.0 / days_to_due(task, now)
}

/// Total urgency order: `Greater` means `a` should be served before `b`.
///
/// Equal scores fall back to the lower (older) id.
pub fn urgency_cmp(a: &Task, b: &Task, now: DateTime<Utc>) -> Ordering {
    score(a, now)
        .total_cmp(&score(b, now))
        .then_with(|| b.id.cmp(&a.id))
}
