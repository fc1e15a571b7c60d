//! Line-oriented session: one command per line, parsed with clap.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use triage_core::time::parse_due;
use triage_core::{Clock, Priority, Scheduler, TaskDraft, TaskId, TaskPatch, TaskStatus};

use crate::config::Config;
use crate::render::{Report, write_ranked, write_stats, write_tasks};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Add a task: add <title...> --due <when> [--priority p] [--estimate m]
    Add(AddArgs),

    /// Patch fields of an existing task
    Update(UpdateArgs),

    /// Mark a task in-progress
    Start { id: u64 },

    /// Mark a task completed
    Done { id: u64 },

    /// Move a task to its next status
    Advance { id: u64 },

    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: u64 },

    /// Ranked view of open tasks
    #[command(alias = "ls")]
    List,

    /// Completed tasks in creation order
    Completed,

    /// Every task in creation order
    All,

    /// Aggregate counts
    Stats,

    /// Ranked view, completed view and stats together
    Report,

    /// End the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(required = true)]
    title: Vec<String>,

    #[arg(short, long)]
    priority: Option<Priority>,

    /// RFC 3339, local "YYYY-MM-DD HH:MM", or relative (+2h, +3d)
    #[arg(short, long)]
    due: Option<String>,

    /// Minutes
    #[arg(short, long)]
    estimate: Option<u32>,

    #[arg(long = "desc")]
    description: Option<String>,

    #[arg(long)]
    status: Option<TaskStatus>,

    /// Id of a task this one depends on (repeatable; informational only)
    #[arg(long = "dep")]
    dependencies: Vec<u64>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: u64,

    #[arg(long)]
    title: Option<String>,

    #[arg(short, long)]
    priority: Option<Priority>,

    #[arg(short, long)]
    due: Option<String>,

    #[arg(short, long)]
    estimate: Option<u32>,

    /// Empty string clears the description
    #[arg(long = "desc")]
    description: Option<String>,

    #[arg(long)]
    status: Option<TaskStatus>,

    /// Replaces the dependency set when given
    #[arg(long = "dep")]
    dependencies: Vec<u64>,

    /// Clear the dependency set
    #[arg(long, conflicts_with = "dependencies")]
    no_deps: bool,
}

/// Split a command line on whitespace, keeping quoted runs together.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut cur = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => cur.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut cur));
                    in_word = false;
                }
            }
            None => {
                cur.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(cur);
    }
    Ok(words)
}

pub struct Session<'a, C: Clock, W: Write> {
    scheduler: &'a mut Scheduler<C>,
    cfg: &'a Config,
    tz: Tz,
    out: W,
}

enum Flow {
    Continue,
    Quit,
}

impl<'a, C: Clock, W: Write> Session<'a, C, W> {
    pub fn new(scheduler: &'a mut Scheduler<C>, cfg: &'a Config, out: W) -> Result<Self> {
        let tz = triage_core::time::parse_timezone(&cfg.general.timezone)?;
        Ok(Self {
            scheduler,
            cfg,
            tz,
            out,
        })
    }

    /// Read commands until EOF or `quit`.
    pub fn run<R: BufRead>(&mut self, input: R, prompt: bool) -> Result<()> {
        if prompt {
            writeln!(self.out, "triage shell. Type `help` for commands.")?;
        }
        let mut lines = input.lines();
        loop {
            if prompt {
                write!(self.out, "> ")?;
                self.out.flush()?;
            }
            let Some(line) = lines.next() else { break };
            let line = line.context("read command")?;
            if let Flow::Quit = self.handle_line(&line)? {
                break;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }
        let words = match split_words(line) {
            Ok(w) => w,
            Err(e) => {
                writeln!(self.out, "error: {e}")?;
                return Ok(Flow::Continue);
            }
        };
        let parsed = match Line::try_parse_from(words) {
            Ok(p) => p,
            Err(e) => {
                write!(self.out, "{}", e.render())?;
                return Ok(Flow::Continue);
            }
        };

        match self.dispatch(parsed.command) {
            Ok(flow) => Ok(flow),
            Err(e) => {
                writeln!(self.out, "error: {e:#}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, cmd: ShellCommand) -> Result<Flow> {
        match cmd {
            ShellCommand::Add(args) => {
                let draft = self.draft_from(args)?;
                let t = self.scheduler.add_task(draft)?;
                writeln!(self.out, "added {}: {}", t.id, t.title)?;
            }
            ShellCommand::Update(args) => {
                let id = TaskId(args.id);
                let patch = self.patch_from(args)?;
                if patch.is_empty() && self.scheduler.get(id).is_some() {
                    writeln!(self.out, "nothing to update for {id}")?;
                    return Ok(Flow::Continue);
                }
                let t = self.scheduler.update_task(id, patch)?;
                writeln!(self.out, "updated {}: {} ({})", t.id, t.title, t.status)?;
            }
            ShellCommand::Start { id } => self.set_status(TaskId(id), TaskStatus::InProgress)?,
            ShellCommand::Done { id } => self.set_status(TaskId(id), TaskStatus::Completed)?,
            ShellCommand::Advance { id } => {
                let t = self.scheduler.advance(TaskId(id))?;
                writeln!(self.out, "{} is {}", t.id, t.status)?;
            }
            ShellCommand::Rm { id } => {
                let t = self.scheduler.delete_task(TaskId(id))?;
                writeln!(self.out, "deleted {}: {}", t.id, t.title)?;
            }
            ShellCommand::List => {
                let entries = self.scheduler.ranked_entries();
                write_ranked(&mut self.out, &entries, &self.tz)?;
            }
            ShellCommand::Completed => {
                let done = self.scheduler.completed_view();
                write_tasks(&mut self.out, "Completed", &done, &self.tz)?;
            }
            ShellCommand::All => {
                let all = self.scheduler.all_tasks();
                write_tasks(&mut self.out, "All tasks", &all, &self.tz)?;
            }
            ShellCommand::Stats => write_stats(&mut self.out, &self.scheduler.stats())?,
            ShellCommand::Report => {
                Report::capture(&*self.scheduler).write_text(&mut self.out, &self.tz)?;
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Result<()> {
        let t = self.scheduler.update_task(id, TaskPatch::status(status))?;
        writeln!(self.out, "{} is {}", t.id, t.status)?;
        Ok(())
    }

    fn parse_due(&self, raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
        parse_due(raw, &self.cfg.general.timezone, self.scheduler.clock().now())
    }

    fn draft_from(&self, args: AddArgs) -> Result<TaskDraft> {
        let mut draft = TaskDraft::new(args.title.join(" "))
            .with_priority(args.priority.unwrap_or(self.cfg.defaults.priority))
            .with_estimate(args.estimate.unwrap_or(self.cfg.defaults.estimate_minutes));
        if let Some(raw) = args.due.as_deref() {
            draft = draft.with_due(self.parse_due(raw)?);
        }
        if let Some(desc) = args.description {
            draft = draft.with_description(desc);
        }
        if let Some(status) = args.status {
            draft = draft.with_status(status);
        }
        for dep in args.dependencies {
            draft = draft.with_dependency(TaskId(dep));
        }
        Ok(draft)
    }

    fn patch_from(&self, args: UpdateArgs) -> Result<TaskPatch> {
        let due_date = args.due.as_deref().map(|raw| self.parse_due(raw)).transpose()?;
        let dependencies = if args.no_deps {
            Some(BTreeSet::new())
        } else if args.dependencies.is_empty() {
            None
        } else {
            Some(args.dependencies.into_iter().map(TaskId).collect())
        };
        Ok(TaskPatch {
            title: args.title,
            description: args.description,
            priority: args.priority,
            due_date,
            status: args.status,
            estimated_time: args.estimate,
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use triage_core::FixedClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn run_script(script: &str) -> (Scheduler<FixedClock>, String) {
        let mut s = Scheduler::with_clock(FixedClock::new(start()));
        let cfg = Config::default();
        let mut out = Vec::new();
        Session::new(&mut s, &cfg, &mut out)
            .unwrap()
            .run(script.as_bytes(), false)
            .unwrap();
        (s, String::from_utf8(out).unwrap())
    }

    #[test]
    fn split_words_honours_quotes() {
        assert_eq!(
            split_words(r#"add "write the report" --due '+2d'"#).unwrap(),
            vec!["add", "write the report", "--due", "+2d"]
        );
        assert_eq!(split_words("  ls  ").unwrap(), vec!["ls"]);
        assert_eq!(split_words(r#"add """#).unwrap(), vec!["add", ""]);
        assert!(split_words(r#"add "oops"#).is_err());
    }

    #[test]
    fn scripted_session_ranks_and_completes() {
        let (s, out) = run_script(
            "add Ship release --priority high --due +10d\n\
             add Water plants -p low -d +1h\n\
             ls\n\
             done 1\n\
             rm 2\n\
             stats\n",
        );

        assert!(out.contains("added 1: Ship release"));
        assert!(out.contains("added 2: Water plants"));
        let ship = out.find("Ship release  due").unwrap();
        let water = out.find("Water plants  due").unwrap();
        assert!(ship < water);
        assert!(out.contains("1 is completed"));
        assert!(out.contains("deleted 2: Water plants"));
        assert!(out.contains("total=1 in-progress=0 completed=1 pending=0 overdue=0"));

        assert_eq!(s.len(), 1);
        assert_eq!(s.completed_view()[0].title, "Ship release");
    }

    #[test]
    fn missing_due_is_reported_and_session_continues() {
        let (s, out) = run_script("add no deadline\nadd has one --due +1d\n");
        assert!(out.contains("error: task due date is required"));
        assert!(out.contains("added 1: has one"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn unknown_id_and_bad_input_do_not_abort() {
        let (s, out) =
            run_script("done 42\nfrobnicate\nadd x --due whenever\nquit\nadd y --due +1d\n");
        assert!(out.contains("task not found: 42"));
        assert!(out.contains("error: parsing due date 'whenever'"));
        assert!(s.is_empty());
    }

    #[test]
    fn update_applies_only_given_fields() {
        let (s, out) = run_script(
            "add draft spec --due +3d --estimate 45 --desc \"first pass\"\n\
             update 1 --priority high --title 'final spec'\n\
             update 1\n",
        );
        assert!(out.contains("updated 1: final spec (pending)"));
        assert!(out.contains("nothing to update for 1"));
        let t = &s.all_tasks()[0];
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.estimated_time, 45);
        assert_eq!(t.description.as_deref(), Some("first pass"));
    }

    #[test]
    fn config_defaults_fill_missing_flags() {
        let mut cfg = Config::default();
        cfg.defaults.priority = Priority::Low;
        cfg.defaults.estimate_minutes = 25;

        let mut s = Scheduler::with_clock(FixedClock::new(start()));
        let mut out = Vec::new();
        Session::new(&mut s, &cfg, &mut out)
            .unwrap()
            .run("add chores --due +2d --dep 7\n".as_bytes(), false)
            .unwrap();

        let t = &s.all_tasks()[0];
        assert_eq!(t.priority, Priority::Low);
        assert_eq!(t.estimated_time, 25);
        assert!(t.dependencies.contains(&TaskId(7)));
    }

    #[test]
    fn update_can_replace_or_clear_dependencies() {
        let (s, out) = run_script(
            "add a --due +1d\n\
             add b --due +2d --dep 1\n\
             update 2 --dep 1 --dep 3\n",
        );
        assert!(out.contains("updated 2: b"));
        let deps: Vec<TaskId> = s.get(TaskId(2)).unwrap().dependencies.iter().copied().collect();
        assert_eq!(deps, vec![TaskId(1), TaskId(3)]);

        let (s, out) = run_script(
            "add a --due +1d\n\
             add b --due +2d --dep 1\n\
             update 2 --no-deps\n\
             update 2 --no-deps --dep 4\n",
        );
        assert!(out.contains("updated 2: b"));
        assert!(out.contains("error:"));
        assert!(s.get(TaskId(2)).unwrap().dependencies.is_empty());
    }
}
