use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::{debug, info};

use super::reset::should_reset;
use crate::detector::{detect, Observation};
use crate::ledger::{Category, Event, Ledgers};
use crate::snapshot::Snapshot;
use crate::state::{StateError, StateStore};

/// Outcome of feeding one snapshot through the tracker
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    /// Genuinely new pickups, already accounted
    pub events: Vec<Event>,
    /// Categories seen for the first time
    pub initialized: Vec<Category>,
    /// Whether month totals were zeroed this cycle
    pub reset: bool,
}

impl CycleReport {
    /// Whether the ledgers were mutated and need persisting
    pub fn changed(&self) -> bool {
        !self.events.is_empty() || !self.initialized.is_empty() || self.reset
    }
}

/// Owns the ledgers for the process and applies snapshots to them.
///
/// The only mutable ledger state in the program; the poll loop threads it
/// through each cycle.
#[derive(Debug)]
pub struct Tracker {
    ledgers: Ledgers,
    store: Option<StateStore>,
    poll_interval: Duration,
}

impl Tracker {
    /// Create a tracker, loading persisted ledgers when a store is configured.
    ///
    /// With `force_init`, categories never observed before get the earliest
    /// possible timestamp so their first snapshot is accounted instead of
    /// only being recorded.
    pub fn open(
        store: Option<StateStore>,
        poll_interval: Duration,
        force_init: bool,
    ) -> Result<Self, StateError> {
        let ledgers = match &store {
            Some(store) => store.load()?,
            None => Ledgers::new(),
        };
        Ok(Self::with_ledgers(ledgers, store, poll_interval, force_init))
    }

    pub fn with_ledgers(
        mut ledgers: Ledgers,
        store: Option<StateStore>,
        poll_interval: Duration,
        force_init: bool,
    ) -> Self {
        if force_init {
            let seeded = ledgers.seed_force_init();
            if !seeded.is_empty() {
                info!("Force-init: next observation of {:?} will be accounted", seeded);
            }
        }

        Self {
            ledgers,
            store,
            poll_interval,
        }
    }

    pub fn ledgers(&self) -> &Ledgers {
        &self.ledgers
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Detect, apply, then reset totals when `now` is in the monthly window
    pub fn observe<Tz: TimeZone>(&mut self, snapshot: &Snapshot, now: &DateTime<Tz>) -> CycleReport {
        let mut report = CycleReport::default();

        for observation in detect(snapshot, &self.ledgers) {
            match observation {
                Observation::Initialized {
                    category,
                    timestamp,
                } => {
                    info!("Initialising data bucket for {} at {}", category, timestamp);
                    self.ledgers.get_mut(category).initialize(timestamp);
                    report.initialized.push(category);
                }
                Observation::Update(event) => {
                    self.ledgers.apply(&event);
                    info!(
                        "Saw an update for {} dated {}: {} (month total {})",
                        event.category,
                        event.timestamp,
                        event.weight,
                        self.ledgers[event.category].month_total
                    );
                    report.events.push(event);
                }
            }
        }

        if should_reset(now, self.poll_interval) {
            info!("Resetting monthly totals");
            self.ledgers.reset_month_totals();
            report.reset = true;
        }

        if !report.changed() {
            debug!("No new pickups");
        }
        report
    }

    /// Write the ledgers to the configured store, if any
    pub fn persist(&self) -> Result<(), StateError> {
        match &self.store {
            Some(store) => store.save(&self.ledgers),
            None => Ok(()),
        }
    }
}
