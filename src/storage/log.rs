//! Reached-log storage: save, load, and list session exports.

use std::{fs, io, path::Path};

use uuid::Uuid;

use crate::model::ReachedLogExport;

use super::{Result, Storage, StorageError};

impl Storage {
    /// Writes a session's export, replacing any earlier export of the same session.
    pub fn save_log(&self, export: &ReachedLogExport) -> Result<()> {
        write_export(&self.log_path(export.session), export)
    }

    /// Loads a single session's export.
    pub fn load_log(&self, session: Uuid) -> Result<ReachedLogExport> {
        let path = self.log_path(session);
        if !path.exists() {
            return Err(StorageError::LogNotFound(session));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Lists all exports, oldest first.
    ///
    /// Files that are not valid exports are skipped.
    pub fn list_logs(&self) -> Result<Vec<ReachedLogExport>> {
        let mut logs = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(logs),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(json) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(export) = serde_json::from_str::<ReachedLogExport>(&json) {
                logs.push(export);
            }
        }
        logs.sort_by(|a, b| a.exported_at.cmp(&b.exported_at));
        Ok(logs)
    }
}

/// Writes an export as pretty JSON to an arbitrary path.
pub fn write_export(path: &Path, export: &ReachedLogExport) -> Result<()> {
    let json = serde_json::to_string_pretty(export)?;
    fs::write(path, json)?;
    Ok(())
}
