//! PM2.5 concentration bands.
//!
//! Two independent scales are used. `Severity` is the coarse three-band
//! scale the dashboard colours values with. `HealthCategory` is the
//! six-band health scale (EPA breakpoints for 24-hour PM2.5) that drives
//! the alert list.

use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Three-band colour scale
// ---------------------------------------------------------------------------

/// Values below this are safe.
pub const MODERATE_FROM_UG_M3: f64 = 50.0;
/// Values above this are dangerous.
pub const DANGEROUS_ABOVE_UG_M3: f64 = 100.0;

/// Display colour band for a concentration.
///
///   value < 50        → Safe
///   50 ≤ value ≤ 100  → Moderate
///   value > 100       → Dangerous
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    Moderate,
    Dangerous,
}

impl Severity {
    pub fn from_value(value: f64) -> Severity {
        if value < MODERATE_FROM_UG_M3 {
            Severity::Safe
        } else if value <= DANGEROUS_ABOVE_UG_M3 {
            Severity::Moderate
        } else {
            Severity::Dangerous
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Severity::Safe => "green",
            Severity::Moderate => "yellow",
            Severity::Dangerous => "red",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Safe => write!(f, "safe"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Dangerous => write!(f, "dangerous"),
        }
    }
}

// ---------------------------------------------------------------------------
// Six-band health scale
// ---------------------------------------------------------------------------

/// Health categories in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HealthCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

/// Inclusive upper bound of each category except `Hazardous`, which is
/// everything above the last entry.
const HEALTH_BREAKPOINTS: &[(f64, HealthCategory)] = &[
    (12.0, HealthCategory::Good),
    (35.4, HealthCategory::Moderate),
    (55.4, HealthCategory::UnhealthyForSensitiveGroups),
    (150.4, HealthCategory::Unhealthy),
    (250.4, HealthCategory::VeryUnhealthy),
];

/// Lowest category that is listed as an alert.
pub const ALERT_FROM: HealthCategory = HealthCategory::UnhealthyForSensitiveGroups;

impl HealthCategory {
    /// Values between two published breakpoints (e.g. 35.45) fall into the
    /// higher band.
    pub fn from_value(value: f64) -> HealthCategory {
        HEALTH_BREAKPOINTS
            .iter()
            .find(|(upper, _)| value <= *upper)
            .map(|(_, category)| *category)
            .unwrap_or(HealthCategory::Hazardous)
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthCategory::Good => "Good",
            HealthCategory::Moderate => "Moderate",
            HealthCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            HealthCategory::Unhealthy => "Unhealthy",
            HealthCategory::VeryUnhealthy => "Very Unhealthy",
            HealthCategory::Hazardous => "Hazardous",
        }
    }

    pub fn is_alert(self) -> bool {
        self >= ALERT_FROM
    }
}

impl fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(Severity::from_value(49.99), Severity::Safe);
        assert_eq!(Severity::from_value(50.0), Severity::Moderate);
        assert_eq!(Severity::from_value(100.0), Severity::Moderate);
        assert_eq!(Severity::from_value(100.01), Severity::Dangerous);
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(Severity::Safe.color(), "green");
        assert_eq!(Severity::Moderate.color(), "yellow");
        assert_eq!(Severity::Dangerous.color(), "red");
    }

    #[test]
    fn test_health_category_boundaries() {
        use HealthCategory::*;
        let cases = [
            (0.5, Good),
            (12.0, Good),
            (12.1, Moderate),
            (35.4, Moderate),
            (35.45, UnhealthyForSensitiveGroups),
            (35.5, UnhealthyForSensitiveGroups),
            (55.4, UnhealthyForSensitiveGroups),
            (55.5, Unhealthy),
            (150.4, Unhealthy),
            (150.5, VeryUnhealthy),
            (250.4, VeryUnhealthy),
            (250.5, Hazardous),
            (999.0, Hazardous),
        ];
        for (value, expected) in cases {
            assert_eq!(HealthCategory::from_value(value), expected, "value {}", value);
        }
    }

    #[test]
    fn test_alert_cutoff() {
        assert!(!HealthCategory::Good.is_alert());
        assert!(!HealthCategory::Moderate.is_alert());
        assert!(HealthCategory::UnhealthyForSensitiveGroups.is_alert());
        assert!(HealthCategory::Hazardous.is_alert());
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            HealthCategory::from_value(42.0).to_string(),
            "Unhealthy for Sensitive Groups"
        );
    }
}
