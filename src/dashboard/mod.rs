//! Console dashboard over a measurement snapshot.
//!
//! `ViewParams` holds the user's three choices (ranking size, map
//! threshold, gauge location). `Dashboard::build` derives all six views
//! from a snapshot and those choices; `render_text` prints them. The
//! `session` module drives the interactive loop.

pub mod session;

use crate::alert::thresholds::{HealthCategory, Severity};
use crate::analysis::snapshot::Snapshot;
use crate::analysis::views::{self, AlertReport, Gauge, LocationMean, MapPoint, RankedRow, SummaryStats};
use crate::config::DashboardConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

// ---------------------------------------------------------------------------
// User parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    pub top_n: u32,
    pub threshold: u32,
    pub location: Option<String>,
}

impl ViewParams {
    pub fn defaults(config: &DashboardConfig) -> Self {
        Self { top_n: config.top_n.default, threshold: config.threshold.default, location: None }
    }

    /// Clamp the sliders to their configured bounds and make sure the
    /// selected location exists in the snapshot, falling back to the first
    /// location in the selector.
    pub fn normalized(mut self, config: &DashboardConfig, snapshot: &Snapshot) -> Self {
        self.top_n = config.top_n.clamp(self.top_n);
        self.threshold = config.threshold.clamp(self.threshold);

        let locations = views::distinct_locations(snapshot);
        let selected_exists = self
            .location
            .as_ref()
            .is_some_and(|l| locations.iter().any(|known| known == l));
        if !selected_exists {
            self.location = locations.into_iter().next();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Assembled views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub loaded_at: DateTime<Utc>,
    pub rows: usize,
    pub locations: Vec<String>,
    pub top_n: u32,
    pub ranking: Vec<LocationMean>,
    pub threshold: u32,
    pub map: Vec<MapPoint>,
    pub table: Vec<RankedRow>,
    pub summary: Option<SummaryStats>,
    pub gauge: Option<Gauge>,
    pub alerts: AlertReport,
}

impl Dashboard {
    /// Derive every view. `params` should already be normalized.
    pub fn build(snapshot: &Snapshot, params: &ViewParams) -> Self {
        Self {
            loaded_at: snapshot.loaded_at(),
            rows: snapshot.len(),
            locations: views::distinct_locations(snapshot),
            top_n: params.top_n,
            ranking: views::rank_locations(snapshot, params.top_n as usize),
            threshold: params.threshold,
            map: views::map_points(snapshot, params.threshold as f64),
            table: views::full_ranking(snapshot),
            summary: views::summary_stats(snapshot),
            gauge: params.location.as_deref().and_then(|l| views::gauge(snapshot, l)),
            alerts: views::alerts(snapshot),
        }
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

const NO_DATA: &str = "No data";
const RULE: &str = "═══════════════════════════════════════════════════════════";

fn marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Safe => "●",
        Severity::Moderate => "▲",
        Severity::Dangerous => "■",
    }
}

fn bar(value: f64, scale_max: f64, width: usize) -> String {
    if scale_max <= 0.0 {
        return String::new();
    }
    let filled = ((value / scale_max) * width as f64).round().clamp(0.0, width as f64) as usize;
    "█".repeat(filled)
}

/// Cap on rows printed for the full ranking table.
const TABLE_ROWS: usize = 25;

pub fn render_text(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text(&mut out, dashboard);
    out
}

fn write_text(out: &mut String, d: &Dashboard) -> std::fmt::Result {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "AIR QUALITY - PM2.5 (µg/m³)")?;
    writeln!(
        out,
        "{} rows, {} locations, loaded {}",
        d.rows,
        d.locations.len(),
        d.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "{}", RULE)?;

    writeln!(out, "\n1. Top {} Polluted Locations", d.top_n)?;
    if d.ranking.is_empty() {
        writeln!(out, "   {}", NO_DATA)?;
    }
    let scale = d.ranking.first().map(|r| r.mean).unwrap_or(0.0);
    for (i, r) in d.ranking.iter().enumerate() {
        writeln!(
            out,
            "   {:>2}. {:<28} {:>8.2} {} {}",
            i + 1,
            r.location,
            r.mean,
            marker(r.severity),
            bar(r.mean, scale, 30)
        )?;
    }

    writeln!(out, "\n2. Distribution Map (≥ {} µg/m³)", d.threshold)?;
    if d.map.is_empty() {
        writeln!(out, "   No located readings at or above the threshold")?;
    }
    for p in &d.map {
        writeln!(
            out,
            "   {} {:<28} {:>8.2}  ({:.4}, {:.4})",
            marker(p.severity),
            p.location,
            p.value,
            p.latitude,
            p.longitude
        )?;
    }

    writeln!(out, "\n3. Air Quality Rankings")?;
    if d.table.is_empty() {
        writeln!(out, "   {}", NO_DATA)?;
    }
    for r in d.table.iter().take(TABLE_ROWS) {
        writeln!(
            out,
            "   {} {:<28} {:>8.2}  {}",
            marker(r.severity),
            r.location,
            r.value,
            r.timestamp.format("%Y-%m-%d %H:%M")
        )?;
    }
    if d.table.len() > TABLE_ROWS {
        writeln!(out, "   ... {} more", d.table.len() - TABLE_ROWS)?;
    }

    writeln!(out, "\n4. Summary Statistics")?;
    match &d.summary {
        Some(s) => {
            writeln!(out, "   Maximum PM2.5: {:.2} µg/m³", s.max)?;
            writeln!(out, "   Minimum PM2.5: {:.2} µg/m³", s.min)?;
            writeln!(out, "   Average PM2.5: {:.2} µg/m³", s.mean)?;
        }
        None => writeln!(out, "   {}", NO_DATA)?,
    }

    writeln!(out, "\n5. Gauge")?;
    match &d.gauge {
        Some(g) => {
            writeln!(
                out,
                "   {}: {:.2} µg/m³ {} {} [{}]",
                g.location,
                g.mean,
                marker(g.severity),
                bar(g.mean.min(200.0), 200.0, 40),
                g.category
            )?;
        }
        None => writeln!(out, "   {}", NO_DATA)?,
    }

    writeln!(out, "\n6. Air Quality Alerts")?;
    if d.alerts.is_clear() {
        writeln!(out, "   ✓ No critical PM2.5 levels detected in any location")?;
    } else {
        writeln!(
            out,
            "   ⚠ {} location(s) at or above \"{}\"",
            d.alerts.alerts.len(),
            HealthCategory::UnhealthyForSensitiveGroups
        )?;
        for a in &d.alerts.alerts {
            writeln!(
                out,
                "   {:<28} mean {:>8.2}  peak {:>8.2}  {}  latest {}",
                a.location,
                a.mean,
                a.peak,
                a.category,
                a.latest.format("%Y-%m-%d %H:%M")
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Measurement;
    use chrono::TimeZone;

    fn row(location: &str, value: f64) -> Measurement {
        Measurement {
            location: location.to_string(),
            parameter: "pm25".to_string(),
            value,
            unit: "µg/m³".to_string(),
            latitude: Some(1.0),
            longitude: Some(2.0),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_params_clamped_and_location_defaulted() {
        let config = DashboardConfig::default();
        let snapshot = Snapshot::from_rows(vec![row("Quito", 20.0), row("Bogota", 30.0)]);
        let params = ViewParams { top_n: 50, threshold: 500, location: Some("Nowhere".into()) }
            .normalized(&config, &snapshot);
        assert_eq!(params.top_n, 20);
        assert_eq!(params.threshold, 200);
        assert_eq!(params.location.as_deref(), Some("Bogota"));
    }

    #[test]
    fn test_params_keep_known_location() {
        let config = DashboardConfig::default();
        let snapshot = Snapshot::from_rows(vec![row("Quito", 20.0), row("Bogota", 30.0)]);
        let params = ViewParams { location: Some("Quito".into()), ..ViewParams::defaults(&config) }
            .normalized(&config, &snapshot);
        assert_eq!(params.location.as_deref(), Some("Quito"));
        assert_eq!(params.top_n, 10);
    }

    #[test]
    fn test_empty_dashboard_renders_empty_states() {
        let config = DashboardConfig::default();
        let snapshot = Snapshot::from_rows(Vec::new());
        let params = ViewParams::defaults(&config).normalized(&config, &snapshot);
        assert_eq!(params.location, None);

        let dashboard = Dashboard::build(&snapshot, &params);
        assert!(dashboard.summary.is_none());
        assert!(dashboard.gauge.is_none());

        let text = render_text(&dashboard);
        assert!(text.contains(NO_DATA));
        assert!(text.contains("No critical PM2.5 levels detected"));
    }

    #[test]
    fn test_render_lists_alerts() {
        let config = DashboardConfig::default();
        let snapshot = Snapshot::from_rows(vec![row("Lahore", 210.0), row("Quito", 8.0)]);
        let params = ViewParams::defaults(&config).normalized(&config, &snapshot);
        let text = render_text(&Dashboard::build(&snapshot, &params));
        assert!(text.contains("1 location(s)"));
        assert!(text.contains("Very Unhealthy"));
        assert!(text.contains("Maximum PM2.5: 210.00"));
    }

    #[test]
    fn test_dashboard_serializes() {
        let config = DashboardConfig::default();
        let snapshot = Snapshot::from_rows(vec![row("Quito", 42.0)]);
        let params = ViewParams::defaults(&config).normalized(&config, &snapshot);
        let json = serde_json::to_value(Dashboard::build(&snapshot, &params)).unwrap();
        assert_eq!(json["ranking"][0]["location"], "Quito");
        assert_eq!(json["gauge"]["category"], "UnhealthyForSensitiveGroups");
        assert_eq!(json["table"][0]["severity"], "safe");
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar(50.0, 100.0, 10).chars().count(), 5);
        assert_eq!(bar(500.0, 100.0, 10).chars().count(), 10);
        assert_eq!(bar(1.0, 0.0, 10), "");
    }
}
