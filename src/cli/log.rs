//! Reached-log commands: list, show.

use clap::Subcommand;
use uuid::Uuid;

use crate::model::ReachedLogExport;
use crate::storage::Storage;

use super::format::{format_entry, format_stats};

#[derive(Debug, Subcommand)]
pub enum LogCommand {
    /// List saved reached logs, oldest first.
    List,

    /// Show one reached log.
    Show {
        /// Session ID: full UUID or unambiguous prefix (e.g. `3fa`).
        session: String,

        /// Print the raw JSON export instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

pub(super) fn cmd_list(storage: &Storage) -> Result<(), String> {
    let logs = storage
        .list_logs()
        .map_err(|e| format!("failed to list reached logs: {e}"))?;

    if logs.is_empty() {
        println!("No reached logs");
        return Ok(());
    }

    for log in &logs {
        let short_id = &log.session.to_string()[..8];
        println!(
            "{short_id}  {}  {}/{} reached",
            log.exported_at.strftime("%Y-%m-%d %H:%M"),
            log.stats.reached,
            log.stats.total
        );
    }

    Ok(())
}

pub(super) fn cmd_show(storage: &Storage, reference: &str, json: bool) -> Result<(), String> {
    let log = resolve_log(storage, reference)?;

    if json {
        let json = serde_json::to_string_pretty(&log)
            .map_err(|e| format!("failed to serialize reached log: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    println!("Session {}", log.session);
    println!("{}", format_stats(&log.stats));
    if log.entries.is_empty() {
        println!("No waypoints reached");
    }
    for entry in &log.entries {
        println!("  {}", format_entry(entry));
    }

    Ok(())
}

/// Resolve a log reference (full UUID or unambiguous prefix) to a saved log.
fn resolve_log(storage: &Storage, reference: &str) -> Result<ReachedLogExport, String> {
    // Try full UUID first.
    if let Ok(id) = reference.parse::<Uuid>() {
        return storage
            .load_log(id)
            .map_err(|e| format!("reached log not found: {e}"));
    }

    let logs = storage
        .list_logs()
        .map_err(|e| format!("failed to list reached logs: {e}"))?;

    let mut matches: Vec<ReachedLogExport> = logs
        .into_iter()
        .filter(|l| l.session.to_string().starts_with(reference))
        .collect();

    match matches.len() {
        0 => Err(format!("no reached log matching '{reference}'")),
        1 => Ok(matches.remove(0)),
        n => {
            let ids: Vec<String> = matches
                .iter()
                .map(|l| l.session.to_string()[..8].to_string())
                .collect();
            Err(format!(
                "'{reference}' is ambiguous, matches {n} logs: {}",
                ids.join(", ")
            ))
        }
    }
}
