//! Prometheus gauges for bin weights.
//!
//! - `bintally_bin_weight{category}`: weight of the latest observed pickup
//! - `bintally_bin_monthly{category}`: month-to-date accumulated weight

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use bintally_core::{Category, CycleReport, Ledgers};

/// Weight of the most recent pickup, updated only on a genuine update.
pub const BIN_WEIGHT: &str = "bintally_bin_weight";

/// Month-to-date weight, updated on updates and zeroed on reset.
pub const BIN_MONTHLY: &str = "bintally_bin_monthly";

const CATEGORY_LABEL: &str = "category";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and describe the gauges.
///
/// Safe to call multiple times; subsequent calls return the same handle.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!("Another metrics recorder is already installed: {}", e);
            }

            describe_gauge!(BIN_WEIGHT, "The weight of the observed bin collection");
            describe_gauge!(BIN_MONTHLY, "Total bin weight over the current month");

            tracing::debug!("Prometheus metrics recorder initialized");
            handle
        })
        .clone()
}

/// Returns the global Prometheus handle, if initialized.
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Handler for the `/metrics` endpoint.
pub async fn serve_metrics() -> impl IntoResponse {
    match prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "text/plain; charset=utf-8")],
            "Metrics not initialized".to_string(),
        ),
    }
}

pub fn set_weight(category: Category, weight: f64) {
    gauge!(BIN_WEIGHT, CATEGORY_LABEL => category.as_str()).set(weight);
}

pub fn set_monthly(category: Category, total: f64) {
    gauge!(BIN_MONTHLY, CATEGORY_LABEL => category.as_str()).set(total);
}

/// Publish month totals restored from the state file, so a restart does not
/// blank the gauge until the next pickup.
pub fn publish_restored(ledgers: &Ledgers) {
    for (category, ledger) in ledgers.iter() {
        if ledger.is_initialized() {
            set_monthly(category, ledger.month_total);
        }
    }
}

/// Apply a poll cycle's outcome to the gauges
pub fn record_cycle(report: &CycleReport, ledgers: &Ledgers) {
    for event in &report.events {
        set_weight(event.category, event.weight);
        set_monthly(event.category, ledgers[event.category].month_total);
    }

    if report.reset {
        for category in Category::ALL {
            set_monthly(category, 0.0);
        }
    }
}
