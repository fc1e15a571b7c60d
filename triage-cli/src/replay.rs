//! JSON-lines event replay.
//!
//! Each non-blank line is one event:
//!
//! ```text
//! {"op":"add","title":"Ship","priority":"high","dueDate":"2026-03-10T09:00:00Z"}
//! {"op":"update","id":1,"patch":{"status":"in-progress"}}
//! {"op":"advance","id":1}
//! {"op":"delete","id":2}
//! {"op":"tick","minutes":90}
//! ```
//!
//! Bad lines are logged and counted; the replay keeps going.

use std::io::BufRead;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use triage_core::{FixedClock, Scheduler, SchedulerError, TaskDraft, TaskId, TaskPatch};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Event {
    Add(TaskDraft),
    Update { id: TaskId, patch: TaskPatch },
    Delete { id: TaskId },
    Advance { id: TaskId },
    /// Move the replay clock forward.
    Tick { minutes: i64 },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Why a well-formed event was not applied.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("tick of {0} minutes moves the clock out of range")]
    ClockOutOfRange(i64),
}

impl Rejection {
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::Scheduler(e) => e.as_label(),
            Rejection::ClockOutOfRange(_) => "clock_out_of_range",
        }
    }
}

pub fn apply(s: &mut Scheduler<FixedClock>, event: Event) -> Result<(), Rejection> {
    match event {
        Event::Add(draft) => s.add_task(draft).map(drop)?,
        Event::Update { id, patch } => s.update_task(id, patch).map(drop)?,
        Event::Delete { id } => s.delete_task(id).map(drop)?,
        Event::Advance { id } => s.advance(id).map(drop)?,
        Event::Tick { minutes } => {
            Duration::try_minutes(minutes)
                .and_then(|by| s.clock().advance(by))
                .ok_or(Rejection::ClockOutOfRange(minutes))?;
        }
    }
    Ok(())
}

pub fn replay<R: BufRead>(s: &mut Scheduler<FixedClock>, input: R) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (idx, line) in input.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.with_context(|| format!("read line {lineno}"))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(line = lineno, "skipping malformed event: {e}");
                summary.rejected += 1;
                continue;
            }
        };
        debug!(line = lineno, ?event, "applying event");

        match apply(s, event) {
            Ok(()) => summary.applied += 1,
            Err(e) => {
                warn!(line = lineno, reason = e.as_label(), "event rejected: {e}");
                summary.rejected += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use triage_core::{Clock, TaskStatus};

    fn scheduler() -> Scheduler<FixedClock> {
        Scheduler::with_clock(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()))
    }

    #[test]
    fn replays_the_reference_scenario() {
        let events = r#"
{"op":"add","title":"A","priority":"high","dueDate":"2026-03-11T09:00:00Z"}
{"op":"add","title":"B","priority":"low","dueDate":"2026-03-01T10:00:00Z"}
{"op":"update","id":1,"patch":{"status":"completed"}}
{"op":"delete","id":2}
"#;
        let mut s = scheduler();
        let summary = replay(&mut s, events.as_bytes()).unwrap();

        assert_eq!(summary, ReplaySummary { applied: 4, rejected: 0 });
        assert_eq!(s.stats().total, 1);
        assert_eq!(s.completed_view()[0].title, "A");
        assert!(s.ranked_view().is_empty());
    }

    #[test]
    fn bad_lines_are_counted_not_fatal() {
        let events = concat!(
            "{\"op\":\"add\",\"title\":\"no due\"}\n",
            "not json\n",
            "{\"op\":\"delete\",\"id\":5}\n",
            "{\"op\":\"add\",\"title\":\"ok\",\"dueDate\":\"2026-03-02T00:00:00Z\"}\n",
            "{\"op\":\"advance\",\"id\":1}\n",
        );
        let mut s = scheduler();
        let summary = replay(&mut s, events.as_bytes()).unwrap();

        assert_eq!(summary, ReplaySummary { applied: 2, rejected: 3 });
        assert_eq!(s.all_tasks()[0].status, TaskStatus::InProgress);
    }

    #[test]
    fn tick_moves_time_for_overdue_checks() {
        let events = concat!(
            "{\"op\":\"add\",\"title\":\"call\",\"dueDate\":\"2026-03-01T10:00:00Z\"}\n",
            "{\"op\":\"tick\",\"minutes\":120}\n",
        );
        let mut s = scheduler();
        replay(&mut s, events.as_bytes()).unwrap();

        assert_eq!(s.clock().now(), Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap());
        assert_eq!(s.stats().overdue, 1);
    }

    #[test]
    fn out_of_range_ticks_are_rejected_and_leave_the_clock() {
        let events = concat!(
            "{\"op\":\"tick\",\"minutes\":9223372036854775807}\n",
            "{\"op\":\"tick\",\"minutes\":1000000000000}\n",
            "{\"op\":\"tick\",\"minutes\":-1000000000000}\n",
            "{\"op\":\"tick\",\"minutes\":30}\n",
        );
        let mut s = scheduler();
        let summary = replay(&mut s, events.as_bytes()).unwrap();

        assert_eq!(summary, ReplaySummary { applied: 1, rejected: 3 });
        assert_eq!(s.clock().now(), Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn tick_rejection_has_its_own_label() {
        let mut s = scheduler();
        let err = apply(&mut s, Event::Tick { minutes: i64::MAX }).unwrap_err();
        assert_eq!(err.as_label(), "clock_out_of_range");

        let err = apply(&mut s, Event::Delete { id: TaskId(9) }).unwrap_err();
        assert_eq!(err.as_label(), "not_found");
    }
}
