//! Local persistence for reached-log exports.
//!
//! Each session's export is one JSON file under the storage root:
//!
//! ```text
//! <root>/<session-uuid>.json
//! ```

mod log;

pub use log::write_export;

use std::{fs, io, path::PathBuf};

use uuid::Uuid;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("reached log not found: {0}")]
    LogNotFound(Uuid),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Local file-based storage for reached logs.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the default storage root: `~/.waymark/logs/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".waymark").join("logs"))
    }

    fn log_path(&self, session: Uuid) -> PathBuf {
        self.root.join(format!("{session}.json"))
    }
}
