//! Core library for bintally.
//!
//! Turns complete pickup snapshots from a waste-collection portal into
//! "new since last check" events, per-bin running monthly totals and a
//! durable state file that survives restarts.

pub mod detector;
pub mod ledger;
pub mod monitor;
pub mod snapshot;
pub mod source;
pub mod state;

pub use detector::{detect, Observation};
pub use ledger::{Category, CategoryLedger, DataQualityError, Event, Ledgers, Timestamp};
pub use monitor::{should_reset, CycleReport, Tracker};
pub use snapshot::Snapshot;
pub use source::{FetchError, GreyhoundClient, SnapshotSource};
pub use state::{StateError, StateStore};
