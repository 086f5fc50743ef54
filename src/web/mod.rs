//! HTTP exposition of bin metrics

mod server;

pub use server::MetricsServer;
