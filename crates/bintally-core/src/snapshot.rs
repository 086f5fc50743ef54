//! Complete per-bin pickup history as reported by a snapshot source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::{Category, DataQualityError, Timestamp};

/// All pickups known upstream, per category.
///
/// Each fetch restates the full history to date; it is never a delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    pickups: BTreeMap<Category, BTreeMap<Timestamp, f64>>,
}

/// One pickup row as the portal reports it
#[derive(Debug, Clone, Deserialize)]
pub struct RawPickup {
    pub waste_type: String,
    pub date_time: String,
    pub weight: RawWeight,
}

/// The portal is inconsistent about quoting weights
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawWeight {
    Number(f64),
    Text(String),
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot listing every known category with no pickups
    pub fn with_all_categories() -> Self {
        let mut snapshot = Self::new();
        for category in Category::ALL {
            snapshot.pickups.entry(category).or_default();
        }
        snapshot
    }

    /// Build a snapshot from raw portal rows.
    ///
    /// Every known category is present in the result, possibly empty.
    pub fn from_entries<I>(entries: I) -> Result<Self, DataQualityError>
    where
        I: IntoIterator<Item = RawPickup>,
    {
        let mut snapshot = Self::with_all_categories();
        for entry in entries {
            let category: Category = entry.waste_type.parse()?;
            if entry.date_time.trim().is_empty() {
                return Err(DataQualityError::MissingTimestamp { category });
            }
            let timestamp = Timestamp::new(entry.date_time);
            let weight = match entry.weight {
                RawWeight::Number(weight) => weight,
                RawWeight::Text(raw) => raw.trim().parse::<f64>().map_err(|_| {
                    DataQualityError::UnparseableWeight {
                        category,
                        timestamp: timestamp.clone(),
                        raw: raw.clone(),
                    }
                })?,
            };
            snapshot.insert(category, timestamp, weight)?;
        }
        Ok(snapshot)
    }

    /// Add a pickup, rejecting weights that cannot be real
    pub fn insert(
        &mut self,
        category: Category,
        timestamp: Timestamp,
        weight: f64,
    ) -> Result<(), DataQualityError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(DataQualityError::InvalidWeight {
                category,
                timestamp,
                weight,
            });
        }
        self.pickups
            .entry(category)
            .or_default()
            .insert(timestamp, weight);
        Ok(())
    }

    /// Mark a category as reported with no pickups
    pub fn insert_empty(&mut self, category: Category) {
        self.pickups.entry(category).or_default();
    }

    /// Pickups for a category, `None` if the category was not reported at all
    pub fn pickups(&self, category: Category) -> Option<&BTreeMap<Timestamp, f64>> {
        self.pickups.get(&category)
    }

    /// Most recent pickup for a category
    pub fn latest(&self, category: Category) -> Option<(&Timestamp, f64)> {
        self.pickups
            .get(&category)?
            .last_key_value()
            .map(|(ts, weight)| (ts, *weight))
    }

    /// Reported categories in category order
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.pickups.keys().copied()
    }

    /// Flattened `(category, timestamp, weight)` rows in category then time order
    pub fn rows(&self) -> impl Iterator<Item = (Category, &Timestamp, f64)> + '_ {
        self.pickups.iter().flat_map(|(category, pickups)| {
            pickups
                .iter()
                .map(move |(ts, weight)| (*category, ts, *weight))
        })
    }

    /// Total number of pickups across categories
    pub fn len(&self) -> usize {
        self.pickups.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
