//! CLI interface for Waymark.
//!
//! Each subcommand is non-interactive: arguments in, structured output out.
//!
//! - `waymark route show <file>`: inspect a route file.
//! - `waymark track <file>`: replay an event script against a route.
//! - `waymark log list|show`: browse saved reached logs.
//!
//! Log references take a full session UUID or an unambiguous prefix.

mod format;
mod log;
mod route;
mod track;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::storage::Storage;

use log::LogCommand;
use route::RouteCommand;
use track::TrackArgs;

/// Waymark: follow a route waypoint by waypoint.
#[derive(Debug, Parser)]
#[command(name = "waymark", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: replaying a race
  1. waymark route show race.json
     → waypoint count, total length, one line per waypoint
  2. waymark track race.json --events fixes.jsonl
     → one JSON event per line on stdout, summary on stderr
  3. waymark log list
  4. waymark log show 3fa

Event script lines:
  {"event":"fix","latitude":41.89,"longitude":12.49,"accuracy":5,"timestampMs":1714550400000}
  {"event":"error","code":3,"message":"timeout"}
  {"event":"skip","atMs":1714550460000}
  {"event":"accept","atMs":1714550470000}
  {"event":"decline","atMs":1714550470000}
  {"event":"tick","atMs":1714550480000}"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect route files.
    Route {
        #[command(subcommand)]
        command: RouteCommand,
    },

    /// Track progress along a route by replaying an event script.
    ///
    /// Events are read from `--events` or stdin, one JSON object per line.
    /// Every tracker event is printed to stdout as one JSON line.
    /// The reached log is saved when the replay ends.
    Track(TrackArgs),

    /// Browse saved reached logs.
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },
}

/// Run a parsed command, returning an error message on failure.
pub fn run(cli: Cli, config: &Config, storage: &Storage) -> Result<(), String> {
    match cli.command {
        Command::Route { command } => match command {
            RouteCommand::Show { file } => route::cmd_show(&file),
        },
        Command::Track(args) => track::cmd_track(config, storage, &args),
        Command::Log { command } => match command {
            LogCommand::List => log::cmd_list(storage),
            LogCommand::Show { session, json } => log::cmd_show(storage, &session, json),
        },
    }
}
