//! Waymark configuration.
//!
//! Loaded from `~/.waymark/config.toml`. Every key is optional; a missing
//! file means defaults.
//!
//! ```toml
//! prompt-timeout-secs = 15
//!
//! [zones]
//! outer = 200.0
//! mid = 100.0
//! arrival = 50.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::ZoneThresholds;
use crate::prompt::SwitchPrompt;

/// Waymark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Radii drawn around the current target.
    pub zones: ZoneThresholds,

    /// How long a switch offer waits for an answer before it is taken.
    pub prompt_timeout_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zones: ZoneThresholds::default(),
            prompt_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Load config from `~/.waymark/config.toml`, or defaults if it does not exist.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if !config.zones.is_ordered() {
            warn!(
                outer = config.zones.outer,
                mid = config.zones.mid,
                arrival = config.zones.arrival,
                "zone thresholds are not ordered arrival <= mid <= outer"
            );
        }

        Ok(config)
    }

    /// The config file path: `~/.waymark/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".waymark").join("config.toml"))
    }

    pub fn prompt_timeout(&self) -> SignedDuration {
        if self.prompt_timeout_secs == 0 {
            return SwitchPrompt::DEFAULT_TIMEOUT;
        }
        SignedDuration::from_secs(i64::from(self.prompt_timeout_secs))
    }
}

/// Where the tracker gets its zone radii.
///
/// Asked once per target transition, so a changed setting applies from the
/// next waypoint on.
pub trait ThresholdSource {
    fn zone_thresholds(&mut self) -> ZoneThresholds;
}

/// Fixed radii.
impl ThresholdSource for ZoneThresholds {
    fn zone_thresholds(&mut self) -> ZoneThresholds {
        *self
    }
}

/// Radii read from a config file, re-read on every request.
///
/// If the file goes missing or turns unreadable or invalid, the last good
/// radii are kept.
#[derive(Debug)]
pub struct ConfigThresholds {
    path: PathBuf,
    last: ZoneThresholds,
}

impl ConfigThresholds {
    pub fn new(path: impl Into<PathBuf>, initial: ZoneThresholds) -> Self {
        Self {
            path: path.into(),
            last: initial,
        }
    }
}

impl ThresholdSource for ConfigThresholds {
    fn zone_thresholds(&mut self) -> ZoneThresholds {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "config file missing, keeping zone thresholds");
            return self.last;
        }
        match Config::load_from(&self.path) {
            Ok(config) => self.last = config.zones,
            Err(e) => warn!(error = %e, "keeping previous zone thresholds"),
        }
        self.last
    }
}
