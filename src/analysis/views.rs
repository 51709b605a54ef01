//! Dashboard views.
//!
//! Every function here is a pure derivation over a `Snapshot` and the
//! user's current choices. None of them mutate the snapshot, and all of
//! them return an empty or `None` result for an empty snapshot.

use crate::alert::thresholds::{HealthCategory, Severity};
use crate::analysis::snapshot::Snapshot;
use crate::model::Measurement;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Per-location grouping
// ---------------------------------------------------------------------------

/// Mean concentration for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationMean {
    pub location: String,
    pub mean: f64,
    pub count: usize,
    pub severity: Severity,
}

struct Group<'a> {
    location: &'a str,
    rows: Vec<&'a Measurement>,
}

/// Group rows by location, in order of each location's first appearance.
fn group_by_location(rows: &[Measurement]) -> Vec<Group<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let i = *index.entry(row.location.as_str()).or_insert_with(|| {
            groups.push(Group { location: row.location.as_str(), rows: Vec::new() });
            groups.len() - 1
        });
        groups[i].rows.push(row);
    }

    groups
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { None } else { Some(sum / count as f64) }
}

fn location_means(snapshot: &Snapshot) -> Vec<LocationMean> {
    group_by_location(snapshot.rows())
        .into_iter()
        .filter_map(|g| {
            let avg = mean(g.rows.iter().map(|m| m.value))?;
            Some(LocationMean {
                location: g.location.to_string(),
                mean: avg,
                count: g.rows.len(),
                severity: Severity::from_value(avg),
            })
        })
        .collect()
}

/// Sorted distinct locations, for the location selector.
pub fn distinct_locations(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .rows()
        .iter()
        .map(|m| m.location.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking view
// ---------------------------------------------------------------------------

/// Top `n` locations by mean concentration, highest first.
///
/// Equal means keep the order in which the locations first appear in the
/// snapshot. Length is `min(n, distinct locations)`.
pub fn rank_locations(snapshot: &Snapshot, n: usize) -> Vec<LocationMean> {
    let mut means = location_means(snapshot);
    means.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    means.truncate(n);
    means
}

// ---------------------------------------------------------------------------
// Map view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub location: String,
    pub value: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
}

/// Rows with `value >= threshold` that can be placed on a map.
pub fn map_points(snapshot: &Snapshot, threshold: f64) -> Vec<MapPoint> {
    snapshot
        .rows()
        .iter()
        .filter(|m| m.value >= threshold)
        .filter_map(|m| {
            Some(MapPoint {
                location: m.location.clone(),
                value: m.value,
                latitude: m.latitude?,
                longitude: m.longitude?,
                severity: Severity::from_value(m.value),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Full ranking table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    pub location: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
}

/// Every row, highest concentration first.
pub fn full_ranking(snapshot: &Snapshot) -> Vec<RankedRow> {
    let mut rows: Vec<RankedRow> = snapshot
        .rows()
        .iter()
        .map(|m| RankedRow {
            location: m.location.clone(),
            value: m.value,
            timestamp: m.timestamp,
            severity: Severity::from_value(m.value),
        })
        .collect();
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    rows
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

/// Max, min and mean over the whole snapshot; `None` when it is empty.
pub fn summary_stats(snapshot: &Snapshot) -> Option<SummaryStats> {
    let rows = snapshot.rows();
    let avg = mean(rows.iter().map(|m| m.value))?;
    let max = rows.iter().map(|m| m.value).fold(f64::NEG_INFINITY, f64::max);
    let min = rows.iter().map(|m| m.value).fold(f64::INFINITY, f64::min);
    Some(SummaryStats { count: rows.len(), max, min, mean: avg })
}

// ---------------------------------------------------------------------------
// Gauge view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    pub location: String,
    pub mean: f64,
    pub severity: Severity,
    pub category: HealthCategory,
}

/// Mean concentration at one location; `None` if it has no rows.
pub fn gauge(snapshot: &Snapshot, location: &str) -> Option<Gauge> {
    let avg = mean(
        snapshot
            .rows()
            .iter()
            .filter(|m| m.location == location)
            .map(|m| m.value),
    )?;
    Some(Gauge {
        location: location.to_string(),
        mean: avg,
        severity: Severity::from_value(avg),
        category: HealthCategory::from_value(avg),
    })
}

// ---------------------------------------------------------------------------
// Alert view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationAlert {
    pub location: String,
    pub mean: f64,
    pub peak: f64,
    pub latest: DateTime<Utc>,
    pub category: HealthCategory,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AlertReport {
    pub alerts: Vec<LocationAlert>,
}

impl AlertReport {
    /// No location is at or above the alert category.
    pub fn is_clear(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Locations whose mean concentration is at least "Unhealthy for
/// Sensitive Groups", worst first.
pub fn alerts(snapshot: &Snapshot) -> AlertReport {
    let mut alerts: Vec<LocationAlert> = group_by_location(snapshot.rows())
        .into_iter()
        .filter_map(|g| {
            let avg = mean(g.rows.iter().map(|m| m.value))?;
            let category = HealthCategory::from_value(avg);
            if !category.is_alert() {
                return None;
            }
            Some(LocationAlert {
                location: g.location.to_string(),
                mean: avg,
                peak: g.rows.iter().map(|m| m.value).fold(f64::NEG_INFINITY, f64::max),
                latest: g.rows.iter().map(|m| m.timestamp).max()?,
                category,
            })
        })
        .collect();
    alerts.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    AlertReport { alerts }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(location: &str, value: f64, coords: Option<(f64, f64)>, hour: u32) -> Measurement {
        Measurement {
            location: location.to_string(),
            parameter: "pm25".to_string(),
            value,
            unit: "µg/m³".to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
        }
    }

    fn fixture() -> Snapshot {
        Snapshot::from_rows(vec![
            at("Delhi", 180.0, Some((28.6, 77.2)), 0),
            at("Oslo", 6.0, Some((59.9, 10.7)), 0),
            at("Delhi", 140.0, Some((28.6, 77.2)), 1),
            at("Lima", 40.0, None, 0),
            at("Oslo", 8.0, Some((59.9, 10.7)), 1),
            at("Accra", 60.0, Some((5.6, -0.2)), 2),
        ])
    }

    #[test]
    fn test_rank_locations_by_mean() {
        let ranking = rank_locations(&fixture(), 3);
        let names: Vec<_> = ranking.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(names, ["Delhi", "Accra", "Lima"]);
        assert_eq!(ranking[0].mean, 160.0);
        assert_eq!(ranking[0].count, 2);
        assert_eq!(ranking[0].severity, Severity::Dangerous);
    }

    #[test]
    fn test_rank_length_is_min_of_n_and_locations() {
        assert_eq!(rank_locations(&fixture(), 20).len(), 4);
        assert_eq!(rank_locations(&fixture(), 0).len(), 0);
    }

    #[test]
    fn test_rank_ties_keep_first_seen_order() {
        let snapshot = Snapshot::from_rows(vec![
            at("B", 30.0, None, 0),
            at("A", 30.0, None, 0),
            at("C", 30.0, None, 0),
        ]);
        let names: Vec<_> = rank_locations(&snapshot, 3).into_iter().map(|r| r.location).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[test]
    fn test_map_points_threshold_and_coordinates() {
        let points = map_points(&fixture(), 40.0);
        // Lima meets the threshold but has no coordinates.
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, [180.0, 140.0, 60.0]);
        assert!(points.iter().all(|p| p.value >= 40.0));
        assert_eq!(points[2].severity, Severity::Moderate);

        assert_eq!(map_points(&fixture(), 60.0).len(), 3);
        assert_eq!(map_points(&fixture(), 60.01).len(), 2);
    }

    #[test]
    fn test_full_ranking_descending() {
        let rows = full_ranking(&fixture());
        assert_eq!(rows.len(), 6);
        assert!(rows.windows(2).all(|w| w[0].value >= w[1].value));
        assert_eq!(rows[0].severity, Severity::Dangerous);
        assert_eq!(rows[5].severity, Severity::Safe);
    }

    #[test]
    fn test_summary_stats() {
        let stats = summary_stats(&fixture()).unwrap();
        assert_eq!(stats.count, 6);
        assert_eq!(stats.max, 180.0);
        assert_eq!(stats.min, 6.0);
        assert!((stats.mean - 72.333_333).abs() < 1e-5);
    }

    #[test]
    fn test_gauge() {
        let g = gauge(&fixture(), "Oslo").unwrap();
        assert_eq!(g.mean, 7.0);
        assert_eq!(g.severity, Severity::Safe);
        assert_eq!(g.category, HealthCategory::Good);
        assert!(gauge(&fixture(), "Nowhere").is_none());
    }

    #[test]
    fn test_alerts_use_location_means() {
        let report = alerts(&fixture());
        let names: Vec<_> = report.alerts.iter().map(|a| a.location.as_str()).collect();
        assert_eq!(names, ["Delhi", "Accra", "Lima"]);

        let delhi = &report.alerts[0];
        assert_eq!(delhi.category, HealthCategory::VeryUnhealthy);
        assert_eq!(delhi.peak, 180.0);
        assert_eq!(delhi.latest, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
        assert_eq!(report.alerts[2].category, HealthCategory::UnhealthyForSensitiveGroups);
    }

    #[test]
    fn test_alert_cutoff_at_sensitive_groups() {
        let snapshot = Snapshot::from_rows(vec![at("A", 35.4, None, 0), at("B", 35.5, None, 0)]);
        let report = alerts(&snapshot);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].location, "B");
    }

    #[test]
    fn test_distinct_locations_sorted() {
        assert_eq!(distinct_locations(&fixture()), ["Accra", "Delhi", "Lima", "Oslo"]);
    }

    #[test]
    fn test_empty_snapshot_degrades() {
        let empty = Snapshot::from_rows(Vec::new());
        assert!(distinct_locations(&empty).is_empty());
        assert!(rank_locations(&empty, 10).is_empty());
        assert!(map_points(&empty, 0.0).is_empty());
        assert!(full_ranking(&empty).is_empty());
        assert_eq!(summary_stats(&empty), None);
        assert_eq!(gauge(&empty, "A"), None);
        assert!(alerts(&empty).is_clear());
    }
}
