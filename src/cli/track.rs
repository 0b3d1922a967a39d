//! The `track` command: replay an event script against a route.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use jiff::Timestamp;
use tracing::{info, warn};

use crate::config::{Config, ConfigThresholds, ThresholdSource};
use crate::error::TrackerError;
use crate::feed::{FeedInput, JsonlFeed, Subscription};
use crate::model::{ReachedLogExport, TrackerEvent, ZoneThresholds};
use crate::prompt::SwitchPrompt;
use crate::storage::{self, Storage};
use crate::tracker::Tracker;

use super::format::{format_entry, format_stats};
use super::route::read_route;

#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Route file (JSON array of waypoints).
    route: PathBuf,

    /// Event script to replay. Reads stdin when omitted.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Arrival radius in meters. Overrides the config file for this run.
    #[arg(long)]
    arrival: Option<f64>,

    /// Mid-zone radius in meters. Overrides the config file for this run.
    #[arg(long)]
    mid: Option<f64>,

    /// Outer-zone radius in meters. Overrides the config file for this run.
    #[arg(long)]
    outer: Option<f64>,

    /// Also write the reached log to this file.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not save the reached log to the log store.
    #[arg(long)]
    no_save: bool,
}

impl TrackArgs {
    /// Fixed radii when any override flag is given.
    fn zone_override(&self, base: ZoneThresholds) -> Option<ZoneThresholds> {
        if self.arrival.is_none() && self.mid.is_none() && self.outer.is_none() {
            return None;
        }
        Some(ZoneThresholds {
            outer: self.outer.unwrap_or(base.outer),
            mid: self.mid.unwrap_or(base.mid),
            arrival: self.arrival.unwrap_or(base.arrival),
        })
    }
}

pub(super) fn cmd_track(
    config: &Config,
    storage: &Storage,
    args: &TrackArgs,
) -> Result<(), String> {
    let route = read_route(&args.route)?;

    let source: Box<dyn ThresholdSource> = match (args.zone_override(config.zones), Config::path())
    {
        (Some(fixed), _) => Box::new(fixed),
        (None, Some(path)) => Box::new(ConfigThresholds::new(path, config.zones)),
        (None, None) => Box::new(config.zones),
    };
    let mut tracker = Tracker::new(source, SwitchPrompt::new(config.prompt_timeout()));

    let loaded = tracker
        .load_route(route)
        .map_err(|e| format!("cannot track {}: {e}", args.route.display()))?;
    let mut stdout = io::stdout().lock();
    emit(&mut stdout, &loaded)?;

    let reader: Box<dyn BufRead> = match &args.events {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let last_seen = replay(&mut tracker, Subscription::new(JsonlFeed::new(reader)), &mut stdout)?;

    let stats = tracker.stats();
    eprintln!("{}", format_stats(&stats));
    for entry in tracker.reached_log() {
        eprintln!("  {}", format_entry(entry));
    }

    let Some(export) = tracker.export_log(last_seen.unwrap_or_else(Timestamp::now)) else {
        return Ok(());
    };
    if let Some(path) = &args.out {
        write_out(path, &export)?;
    }
    if !args.no_save {
        storage
            .save_log(&export)
            .map_err(|e| format!("failed to save reached log: {e}"))?;
        let short_id = &export.session.to_string()[..8];
        let date = export.exported_at.strftime("%Y-%m-%d");
        eprintln!("Saved log {short_id}");
        eprintln!("Export with: waymark log show {short_id} --json > race_log_{date}.json");
    }

    Ok(())
}

/// Writes the export to an explicit file. An empty log is not written.
fn write_out(path: &Path, export: &ReachedLogExport) -> Result<bool, String> {
    if export.entries.is_empty() {
        eprintln!("No waypoints reached yet, not writing {}", path.display());
        return Ok(false);
    }
    storage::write_export(path, export)
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    eprintln!("Reached log → {}", path.display());
    Ok(true)
}

/// Feeds every input to the tracker and writes the resulting events as JSON lines.
///
/// The subscription is cancelled once the route completes. Tracker errors
/// are logged and the replay goes on. Returns the latest event time seen.
fn replay<I, W>(
    tracker: &mut Tracker,
    subscription: Subscription<I>,
    out: &mut W,
) -> Result<Option<Timestamp>, String>
where
    I: Iterator<Item = FeedInput>,
    W: Write,
{
    let cancel = subscription.cancel_handle();
    let mut last_seen = None;

    for input in subscription {
        if let Some(at) = input_time(&input) {
            last_seen = Some(last_seen.map_or(at, |prev: Timestamp| prev.max(at)));
        }
        match tracker.handle(input) {
            Ok(events) => {
                emit(out, &events)?;
                if events.contains(&TrackerEvent::RouteCompleted) {
                    info!("route completed, closing feed");
                    cancel.cancel();
                }
            }
            Err(TrackerError::NoActiveTarget) => {
                warn!("input ignored: no active target");
            }
            Err(e) => warn!(error = %e, "input rejected"),
        }
    }

    Ok(last_seen)
}

fn input_time(input: &FeedInput) -> Option<Timestamp> {
    match input {
        FeedInput::Position(Ok(fix)) => fix.timestamp(),
        FeedInput::Position(Err(_)) => None,
        FeedInput::Skip { at }
        | FeedInput::Reached { at }
        | FeedInput::Accept { at, .. }
        | FeedInput::Decline { at, .. }
        | FeedInput::Tick { at } => Some(*at),
    }
}

fn emit<W: Write>(out: &mut W, events: &[TrackerEvent]) -> Result<(), String> {
    for event in events {
        let line =
            serde_json::to_string(event).map_err(|e| format!("failed to serialize event: {e}"))?;
        writeln!(out, "{line}").map_err(|e| format!("failed to write event: {e}"))?;
    }
    Ok(())
}
