//! bintally: Greyhound bin pickup tracker and Prometheus exporter.

pub mod config;
pub mod metrics;
pub mod monitor;
pub mod output;
pub mod web;
