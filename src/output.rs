//! One-shot rendering of a snapshot.

use anyhow::{Context, Result};
use std::fmt::Write as _;

use bintally_core::Snapshot;

use crate::config::OutputFormat;

/// Render a snapshot in the requested format
pub fn render(snapshot: &Snapshot, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(snapshot).context("Failed to serialize snapshot")
        }
        OutputFormat::Csv => render_csv(snapshot),
        OutputFormat::Pretty => Ok(render_pretty(snapshot)),
    }
}

fn render_csv(snapshot: &Snapshot) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["category", "date_time", "weight"])?;
    for (category, timestamp, weight) in snapshot.rows() {
        let weight = weight.to_string();
        writer.write_record([category.as_str(), timestamp.as_str(), weight.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

fn render_pretty(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for category in snapshot.categories() {
        let pickups = snapshot.pickups(category).map(|p| p.len()).unwrap_or(0);
        let _ = writeln!(out, "{} ({} pickups)", category, pickups);
        for (timestamp, weight) in snapshot.pickups(category).into_iter().flatten() {
            let _ = writeln!(out, "  {:<20} {:>8.2} kg", timestamp.as_str(), weight);
        }
    }
    out
}
