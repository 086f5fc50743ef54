use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, error, warn};

use bintally_core::{CycleReport, FetchError, SnapshotSource, Tracker};

use crate::metrics;

/// Daemon loop: fetch, track, persist, publish, sleep.
///
/// One cycle runs to completion before the next starts. A failed fetch skips
/// the cycle entirely and waits the full interval before trying again.
pub struct Poller<S> {
    source: S,
    tracker: Tracker,
}

impl<S: SnapshotSource> Poller<S> {
    /// Create a new poller
    pub fn new(source: S, tracker: Tracker) -> Self {
        Self { source, tracker }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Run the polling loop until the task is dropped
    pub async fn run(mut self) {
        let interval = self.tracker.poll_interval();
        metrics::publish_restored(self.tracker.ledgers());

        loop {
            debug!("Checking for bin update");
            // The portal client blocks; keep the runtime's other tasks moving
            let _ = tokio::task::block_in_place(|| self.poll_once_at(&Local::now()));

            tokio::time::sleep(interval).await;
        }
    }

    /// Perform a single poll cycle as of `now`
    pub fn poll_once_at<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<CycleReport, FetchError> {
        let snapshot = match self.source.fetch() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if e.is_data_quality() {
                    error!("Portal returned unusable bin data: {}", e);
                } else {
                    warn!("Failed to get bin data: {}", e);
                }
                return Err(e);
            }
        };
        debug!("Fetched {} pickups", snapshot.len());

        let report = self.tracker.observe(&snapshot, now);

        if report.changed() {
            if let Err(e) = self.tracker.persist() {
                error!("Failed to save state: {}", e);
            }
        }

        metrics::record_cycle(&report, self.tracker.ledgers());
        Ok(report)
    }
}
