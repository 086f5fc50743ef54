//! Per-bin ledgers: the last pickup seen and the running month-to-date weight.

mod book;
mod types;

pub use book::{CategoryLedger, Ledgers};
pub use types::{Category, DataQualityError, Event, Timestamp};
