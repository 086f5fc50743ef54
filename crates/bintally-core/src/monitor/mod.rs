//! Per-cycle tracking engine driven by the poll loop.

mod reset;
mod tracker;

pub use reset::should_reset;
pub use tracker::{CycleReport, Tracker};
