//! Plain-text and JSON rendering of scheduler views.

use std::io::{self, Write};

use chrono_tz::Tz;
use serde::Serialize;
use triage_core::time::format_local;
use triage_core::{Clock, RankedEntry, Scheduler, Task, TaskStats};

use crate::replay::ReplaySummary;

/// Everything the presentation layer shows at once.
#[derive(Debug, Serialize)]
pub struct Report {
    pub ranked: Vec<RankedEntry>,
    pub completed: Vec<Task>,
    pub stats: TaskStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<ReplaySummary>,
}

impl Report {
    pub fn capture<C: Clock>(s: &Scheduler<C>) -> Self {
        let now = s.clock().now();
        Self {
            ranked: s.ranked_entries_at(now),
            completed: s.completed_view(),
            stats: s.stats_at(now),
            replay: None,
        }
    }

    pub fn with_replay(mut self, summary: ReplaySummary) -> Self {
        self.replay = Some(summary);
        self
    }

    pub fn write_text<W: Write>(&self, out: &mut W, tz: &Tz) -> io::Result<()> {
        write_ranked(out, &self.ranked, tz)?;
        writeln!(out)?;
        write_tasks(out, "Completed", &self.completed, tz)?;
        writeln!(out)?;
        write_stats(out, &self.stats)
    }

    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self).map_err(io::Error::other)?;
        writeln!(out)
    }
}

pub fn write_ranked<W: Write>(out: &mut W, entries: &[RankedEntry], tz: &Tz) -> io::Result<()> {
    writeln!(out, "Scheduled (priority order)")?;
    if entries.is_empty() {
        return writeln!(out, "  No tasks scheduled.");
    }
    for e in entries {
        let t = &e.task;
        write!(
            out,
            "  #{:<3} {:>6.2}  [{:<6}] {:>4}  {}  due {}  {}  ~{}m",
            e.rank,
            e.score,
            t.priority,
            t.id,
            t.title,
            format_local(t.due_date, tz),
            t.status,
            t.estimated_time
        )?;
        if e.overdue {
            write!(out, "  OVERDUE")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_tasks<W: Write>(
    out: &mut W,
    heading: &str,
    tasks: &[Task],
    tz: &Tz,
) -> io::Result<()> {
    writeln!(out, "{heading}")?;
    if tasks.is_empty() {
        return writeln!(out, "  (none)");
    }
    for t in tasks {
        writeln!(
            out,
            "  {:>4}  [{:<6}] {}  due {}  {}",
            t.id,
            t.priority,
            t.title,
            format_local(t.due_date, tz),
            t.status
        )?;
    }
    Ok(())
}

pub fn write_stats<W: Write>(out: &mut W, s: &TaskStats) -> io::Result<()> {
    writeln!(
        out,
        "total={} in-progress={} completed={} pending={} overdue={}",
        s.total, s.in_progress, s.completed, s.pending, s.overdue
    )
}
