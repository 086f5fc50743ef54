//! Update detection: diff a snapshot against the ledgers.
//!
//! Only the newest pickup per category is ever considered. When several
//! pickups land between two polls (e.g. after an outage) the older ones are
//! not accounted; at a daily poll cadence against weekly collections this
//! does not happen in practice.

use serde::Serialize;

use crate::ledger::{Category, Event, Ledgers, Timestamp};
use crate::snapshot::Snapshot;

/// What the detector concluded for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// First sight of this category: remember the timestamp, account nothing
    Initialized {
        category: Category,
        timestamp: Timestamp,
    },
    /// A pickup newer than anything seen before
    Update(Event),
}

impl Observation {
    pub fn category(&self) -> Category {
        match self {
            Observation::Initialized { category, .. } => *category,
            Observation::Update(event) => event.category,
        }
    }

    /// The accounting event, if this observation carries one
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Observation::Update(event) => Some(event),
            Observation::Initialized { .. } => None,
        }
    }
}

/// Compare a snapshot against the ledgers.
///
/// Categories that are missing from the snapshot, or present with no
/// pickups, produce nothing. Pure: the ledgers are not modified.
pub fn detect(snapshot: &Snapshot, ledgers: &Ledgers) -> Vec<Observation> {
    let mut observations = Vec::new();

    for category in snapshot.categories() {
        let Some((latest, weight)) = snapshot.latest(category) else {
            tracing::info!("Saw no data for {} - skipping (new year maybe?)", category);
            continue;
        };

        match &ledgers[category].last_seen {
            None => observations.push(Observation::Initialized {
                category,
                timestamp: latest.clone(),
            }),
            Some(last_seen) if latest > last_seen => {
                observations.push(Observation::Update(Event {
                    category,
                    timestamp: latest.clone(),
                    weight,
                }))
            }
            Some(_) => {}
        }
    }

    observations
}

/// Only the accounting events from [`detect`]
pub fn detect_events(snapshot: &Snapshot, ledgers: &Ledgers) -> Vec<Event> {
    detect(snapshot, ledgers)
        .into_iter()
        .filter_map(|observation| match observation {
            Observation::Update(event) => Some(event),
            Observation::Initialized { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot(rows: &[(Category, &str, f64)], empty: &[Category]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (category, ts, weight) in rows {
            snapshot
                .insert(*category, Timestamp::from(*ts), *weight)
                .unwrap();
        }
        for category in empty {
            snapshot.insert_empty(*category);
        }
        snapshot
    }

    fn apply_all(ledgers: &mut Ledgers, observations: &[Observation]) {
        for observation in observations {
            match observation {
                Observation::Initialized {
                    category,
                    timestamp,
                } => ledgers.get_mut(*category).initialize(timestamp.clone()),
                Observation::Update(event) => ledgers.apply(event),
            }
        }
    }

    #[test]
    fn test_first_sight_only_initializes() {
        let first = snapshot(
            &[
                (Category::Green, "2024-01-05", 10.0),
                (Category::Black, "2024-01-03", 5.0),
            ],
            &[Category::Brown],
        );
        let mut ledgers = Ledgers::new();

        let observations = detect(&first, &ledgers);
        assert_eq!(
            observations,
            vec![
                Observation::Initialized {
                    category: Category::Green,
                    timestamp: Timestamp::from("2024-01-05"),
                },
                Observation::Initialized {
                    category: Category::Black,
                    timestamp: Timestamp::from("2024-01-03"),
                },
            ]
        );
        assert!(observations.iter().all(|o| o.as_event().is_none()));

        apply_all(&mut ledgers, &observations);
        assert_eq!(
            ledgers[Category::Green].last_seen,
            Some(Timestamp::from("2024-01-05"))
        );
        assert_eq!(
            ledgers[Category::Black].last_seen,
            Some(Timestamp::from("2024-01-03"))
        );
        assert_eq!(ledgers[Category::Brown].last_seen, None);
    }

    #[test]
    fn test_new_pickup_emits_single_event() {
        let mut ledgers = Ledgers::new();
        let first = snapshot(
            &[
                (Category::Green, "2024-01-05", 10.0),
                (Category::Black, "2024-01-03", 5.0),
            ],
            &[Category::Brown],
        );
        let observations = detect(&first, &ledgers);
        apply_all(&mut ledgers, &observations);

        let second = snapshot(
            &[
                (Category::Green, "2024-01-05", 10.0),
                (Category::Green, "2024-01-12", 8.0),
                (Category::Black, "2024-01-03", 5.0),
            ],
            &[Category::Brown],
        );
        let events = detect_events(&second, &ledgers);
        assert_eq!(
            events,
            vec![Event {
                category: Category::Green,
                timestamp: Timestamp::from("2024-01-12"),
                weight: 8.0,
            }]
        );

        for event in &events {
            ledgers.apply(event);
        }
        assert_eq!(ledgers[Category::Green].month_total, 8.0);
    }

    #[test]
    fn test_re_observation_is_idempotent() {
        let mut ledgers = Ledgers::new();
        ledgers
            .get_mut(Category::Green)
            .initialize(Timestamp::from("2024-01-05"));
        let snap = snapshot(
            &[
                (Category::Green, "2024-01-05", 10.0),
                (Category::Green, "2024-01-12", 8.0),
            ],
            &[],
        );

        let first = detect(&snap, &ledgers);
        assert_eq!(first.len(), 1);
        apply_all(&mut ledgers, &first);

        assert!(detect(&snap, &ledgers).is_empty());
    }

    #[test]
    fn test_only_newest_of_several_is_accounted() {
        let mut ledgers = Ledgers::new();
        ledgers
            .get_mut(Category::Black)
            .initialize(Timestamp::from("2024-01-03"));
        let snap = snapshot(
            &[
                (Category::Black, "2024-01-03", 5.0),
                (Category::Black, "2024-01-10", 6.0),
                (Category::Black, "2024-01-17", 7.0),
            ],
            &[],
        );

        let events = detect_events(&snap, &ledgers);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, Timestamp::from("2024-01-17"));
        assert_eq!(events[0].weight, 7.0);
    }

    #[test]
    fn test_older_latest_is_ignored() {
        let mut ledgers = Ledgers::new();
        ledgers
            .get_mut(Category::Green)
            .initialize(Timestamp::from("2024-02-01"));
        let snap = snapshot(&[(Category::Green, "2024-01-20", 4.0)], &[]);

        assert!(detect(&snap, &ledgers).is_empty());
    }

    #[test]
    fn test_absent_and_empty_categories_untouched() {
        let mut ledgers = Ledgers::new();
        ledgers
            .get_mut(Category::Brown)
            .initialize(Timestamp::from("2024-01-01"));
        let snap = snapshot(&[], &[Category::Brown, Category::Green]);

        assert!(detect(&snap, &ledgers).is_empty());
    }

    #[test]
    fn test_sentinel_forces_update() {
        let mut ledgers = Ledgers::new();
        ledgers.seed_force_init();
        let snap = snapshot(&[(Category::Brown, "2024-01-04", 3.5)], &[]);

        let events = detect_events(&snap, &ledgers);
        assert_eq!(
            events,
            vec![Event {
                category: Category::Brown,
                timestamp: Timestamp::from("2024-01-04"),
                weight: 3.5,
            }]
        );
    }
}
