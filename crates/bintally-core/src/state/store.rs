//! Durable ledger state.
//!
//! The state file is JSON with exactly one key per bin plus `month_totals`:
//!
//! ```json
//! {
//!   "green": {"last_seen": "2024-01-12 08:40:00", "last_weight": 8.0},
//!   "brown": {"last_seen": null, "last_weight": null},
//!   "black": {"last_seen": "2024-01-03 07:30:00", "last_weight": null},
//!   "month_totals": {"green": 8.0, "brown": 0.0, "black": 0.0}
//! }
//! ```
//!
//! Loading is strict: a file written by a different schema is rejected
//! rather than migrated, so historical totals are never silently lost.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ledger::{Category, CategoryLedger, Ledgers, Timestamp};

/// Failures loading or saving the state file
#[derive(Debug, Error)]
pub enum StateError {
    /// The file exists but does not match the expected schema
    #[error("corrupt state file {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("state file I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One bin's persisted observation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersistedLedger {
    last_seen: Option<Timestamp>,
    last_weight: Option<f64>,
}

/// Per-bin month-to-date totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MonthTotals {
    green: f64,
    brown: f64,
    black: f64,
}

/// On-disk layout; every field is required
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersistedState {
    green: PersistedLedger,
    brown: PersistedLedger,
    black: PersistedLedger,
    month_totals: MonthTotals,
}

impl PersistedState {
    fn from_ledgers(ledgers: &Ledgers) -> Self {
        let entry = |category: Category| {
            let ledger = ledgers.get(category);
            PersistedLedger {
                last_seen: ledger.last_seen.clone(),
                last_weight: ledger.last_weight,
            }
        };
        Self {
            green: entry(Category::Green),
            brown: entry(Category::Brown),
            black: entry(Category::Black),
            month_totals: MonthTotals {
                green: ledgers[Category::Green].month_total,
                brown: ledgers[Category::Brown].month_total,
                black: ledgers[Category::Black].month_total,
            },
        }
    }

    fn into_ledgers(self) -> Result<Ledgers, String> {
        let mut ledgers = Ledgers::new();
        let entries = [
            (Category::Green, self.green, self.month_totals.green),
            (Category::Brown, self.brown, self.month_totals.brown),
            (Category::Black, self.black, self.month_totals.black),
        ];

        for (category, persisted, month_total) in entries {
            if !month_total.is_finite() || month_total < 0.0 {
                return Err(format!("invalid month total {} for {}", month_total, category));
            }
            if let Some(weight) = persisted.last_weight {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(format!("invalid last weight {} for {}", weight, category));
                }
            }
            *ledgers.get_mut(category) = CategoryLedger {
                last_seen: persisted.last_seen,
                last_weight: persisted.last_weight,
                month_total,
            };
        }

        Ok(ledgers)
    }
}

/// Reads and atomically writes the ledger state file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load ledgers from disk.
    ///
    /// A missing file is a first run and yields empty ledgers.
    pub fn load(&self) -> Result<Ledgers, StateError> {
        if !self.path.exists() {
            info!("No state file at {:?}, starting fresh", self.path);
            return Ok(Ledgers::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;

        let persisted: PersistedState =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        let ledgers = persisted.into_ledgers().map_err(|reason| self.corrupt(reason))?;

        debug!("Loaded state from {:?}", self.path);
        Ok(ledgers)
    }

    /// Write ledgers to disk.
    ///
    /// Writes a sibling temp file, syncs it and renames it over the state
    /// file, so a crash at any point leaves either the previous or the new
    /// state intact. The temp file is created with O_CREAT|O_EXCL so a
    /// planted symlink is never followed.
    pub fn save(&self, ledgers: &Ledgers) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(&PersistedState::from_ledgers(ledgers))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = self.temp_path();

        // Leftover from a write that died before its rename
        let _ = fs::remove_file(&temp_path);

        let io_err = |source| StateError::Io {
            path: temp_path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.sync_parent_dir();
        debug!("Saved state to {:?}", self.path);
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Make the rename itself durable. Not fatal: the data is already synced.
    fn sync_parent_dir(&self) {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
            debug!("Could not sync state directory {:?}: {}", parent, e);
        }
    }

    fn corrupt(&self, reason: String) -> StateError {
        StateError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
