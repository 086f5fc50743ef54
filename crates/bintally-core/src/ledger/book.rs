use std::ops::Index;

use super::types::{Category, Event, Timestamp};

/// Accounting state for a single bin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryLedger {
    /// Most recent pickup seen (`None` until the bin is first observed)
    pub last_seen: Option<Timestamp>,
    /// Weight of the most recently accounted pickup
    pub last_weight: Option<f64>,
    /// Sum of accounted weights since the last monthly reset
    pub month_total: f64,
}

impl CategoryLedger {
    /// Whether this bin has been observed at least once
    pub fn is_initialized(&self) -> bool {
        self.last_seen.is_some()
    }

    /// Account a new pickup
    pub fn apply(&mut self, event: &Event) {
        self.last_seen = Some(event.timestamp.clone());
        self.last_weight = Some(event.weight);
        self.month_total += event.weight;
    }

    /// Record the first observation without accounting any weight
    pub fn initialize(&mut self, timestamp: Timestamp) {
        self.last_seen = Some(timestamp);
    }

    pub fn reset_month_total(&mut self) {
        self.month_total = 0.0;
    }
}

/// Ledgers for every tracked category.
///
/// Always holds one entry per [`Category`]; a bin that has never been
/// observed has an entry with no `last_seen`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledgers {
    entries: [CategoryLedger; Category::COUNT],
}

impl Ledgers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> &CategoryLedger {
        &self.entries[category.index()]
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategoryLedger {
        &mut self.entries[category.index()]
    }

    /// Iterate `(category, ledger)` pairs in category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryLedger)> {
        Category::ALL.into_iter().zip(self.entries.iter())
    }

    /// Account a detected pickup against its category
    pub fn apply(&mut self, event: &Event) {
        self.get_mut(event.category).apply(event);
    }

    /// Zero every month-to-date total
    pub fn reset_month_totals(&mut self) {
        for ledger in &mut self.entries {
            ledger.reset_month_total();
        }
    }

    /// Give every unobserved category the earliest-possible timestamp so the
    /// next snapshot is accounted as a real update instead of an initialisation
    pub fn seed_force_init(&mut self) -> Vec<Category> {
        let mut seeded = Vec::new();
        for category in Category::ALL {
            let ledger = self.get_mut(category);
            if !ledger.is_initialized() {
                ledger.initialize(Timestamp::earliest());
                seeded.push(category);
            }
        }
        seeded
    }
}

impl Index<Category> for Ledgers {
    type Output = CategoryLedger;

    fn index(&self, category: Category) -> &Self::Output {
        self.get(category)
    }
}
