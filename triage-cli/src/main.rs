use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use triage_core::{FixedClock, Scheduler};

mod config;
mod logging;
mod render;
mod replay;
mod shell;
mod state;

use logging::LogLevel;
use render::Report;

#[derive(Parser, Debug)]
#[command(
    name = "triage",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TRIAGE_BUILD_SHA"), ")"),
    about = "Track tasks and see them ranked by urgency"
)]
struct Cli {
    /// Log level for stderr output (overrides TRIAGE_LOG and config)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// IANA timezone for local due dates and listings (overrides config)
    #[arg(long, global = true)]
    tz: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session: add, update, complete and list tasks
    Shell,

    /// Apply a JSON-lines event stream and print the resulting views
    Replay {
        /// Event file; `-` or omitted reads stdin
        file: Option<PathBuf>,

        /// Pin the replay clock to this RFC 3339 instant (default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.triage/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,

    /// Print the effective config
    Show,

    /// Print the config file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config()?;
    if let Some(tz) = cli.tz {
        triage_core::time::parse_timezone(&tz)?;
        cfg.general.timezone = tz;
    }
    logging::init_logging(cli.log_level, cfg.general.log_level.as_deref())?;

    match cli.command {
        Command::Shell => {
            let mut scheduler = Scheduler::new();
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            shell::Session::new(&mut scheduler, &cfg, io::stdout().lock())?
                .run(stdin.lock(), interactive)?;
        }

        Command::Replay { file, at, json } => {
            let mut scheduler = Scheduler::with_clock(FixedClock::new(at.unwrap_or_else(Utc::now)));

            let summary = match file.filter(|p| p.as_os_str() != "-") {
                Some(path) => {
                    let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
                    replay::replay(&mut scheduler, BufReader::new(f))
                        .with_context(|| format!("replaying {}", path.display()))?
                }
                None => replay::replay(&mut scheduler, io::stdin().lock())?,
            };
            tracing::info!(
                applied = summary.applied,
                rejected = summary.rejected,
                "replay finished"
            );

            let rejected = summary.rejected;
            let report = Report::capture(&scheduler).with_replay(summary);
            let mut out = io::stdout().lock();
            if json {
                report.write_json(&mut out)?;
            } else {
                let tz = triage_core::time::parse_timezone(&cfg.general.timezone)?;
                report.write_text(&mut out, &tz)?;
            }
            if rejected > 0 {
                eprintln!("{rejected} event(s) rejected");
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
            ConfigCommand::Path => println!("{}", config::config_path()?.display()),
        },
    }

    Ok(())
}
