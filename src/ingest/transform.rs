//! Raw record normalization.
//!
//! Turns the heterogeneous OpenAQ records into flat `Measurement` rows:
//!
//! 1. drop the configured irrelevant fields,
//! 2. keep only PM2.5 records,
//! 3. flatten `coordinates.{latitude,longitude}`,
//! 4. flatten `date.utc` into a UTC timestamp,
//! 5. discard non-positive concentrations,
//! 6. project to the table's columns, dropping incomplete records.
//!
//! Output keeps the input order.

use crate::config::{Fallback, TransformConfig};
use crate::ingest::openaq::RawRecord;
use crate::model::{Measurement, PARAM_PM25, TransformError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Fields every stored row needs. If none of the PM2.5 records in a batch
/// has one of these, the upstream schema has changed and the batch fails.
const REQUIRED_FIELDS: &[&str] = &["location", "value", "unit", "date"];

/// Why records were left out of a transformed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub other_parameter: usize,
    pub non_positive: usize,
    pub missing_field: usize,
    pub missing_coordinates: usize,
    pub bad_timestamp: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.other_parameter
            + self.non_positive
            + self.missing_field
            + self.missing_coordinates
            + self.bad_timestamp
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutcome {
    pub rows: Vec<Measurement>,
    pub dropped: DropCounts,
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

fn non_empty_str(record: &RawRecord, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Concentration as a float; numeric strings are accepted.
fn extract_value(record: &RawRecord) -> Option<f64> {
    match record.get("value") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// `coordinates: {latitude, longitude}` → both numbers, or `None` when the
/// structure is absent, not an object, or either member is not numeric.
pub fn extract_coordinates(record: &RawRecord) -> Option<(f64, f64)> {
    let coords = record.get("coordinates")?.as_object()?;
    let lat = coords.get("latitude")?.as_f64()?;
    let lon = coords.get("longitude")?.as_f64()?;
    Some((lat, lon))
}

/// `date` is either `{utc: "...", local: "..."}` or a bare string.
fn extract_date_text(record: &RawRecord) -> Option<&str> {
    match record.get("date")? {
        Value::Object(date) => date.get("utc")?.as_str(),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Parse an RFC 3339 instant, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken
/// as UTC.
pub fn parse_utc(text: &str) -> Result<DateTime<Utc>, TransformError> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| TransformError::InvalidTimestamp {
            value: text.to_string(),
            reason: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Normalize a batch of raw records.
///
/// Other pollutants, non-positive readings and incomplete records are
/// dropped and counted. The batch fails when a required field is absent
/// from every PM2.5 record, or when a fallback policy is `fail` and a
/// record triggers it.
pub fn transform(
    records: Vec<RawRecord>,
    config: &TransformConfig,
) -> Result<TransformOutcome, TransformError> {
    let mut dropped = DropCounts::default();

    let candidates: Vec<RawRecord> = records
        .into_iter()
        .map(|mut record| {
            for field in &config.dropped_fields {
                record.remove(field);
            }
            record
        })
        .filter(|record| {
            let keep = record.get("parameter").and_then(Value::as_str) == Some(PARAM_PM25);
            if !keep {
                dropped.other_parameter += 1;
            }
            keep
        })
        .collect();

    if !candidates.is_empty() {
        for field in REQUIRED_FIELDS {
            if candidates.iter().all(|r| r.get(*field).is_none_or(Value::is_null)) {
                return Err(TransformError::MissingField { field: field.to_string() });
            }
        }
    }

    let mut rows = Vec::with_capacity(candidates.len());
    for record in &candidates {
        if let Some(row) = normalize_record(record, config, &mut dropped)? {
            rows.push(row);
        }
    }

    log::debug!(
        target: crate::logging::TRANSFORM,
        "Kept {} of {} PM2.5 records ({} dropped overall)",
        rows.len(),
        candidates.len(),
        dropped.total()
    );

    Ok(TransformOutcome { rows, dropped })
}

fn normalize_record(
    record: &RawRecord,
    config: &TransformConfig,
    dropped: &mut DropCounts,
) -> Result<Option<Measurement>, TransformError> {
    let location = non_empty_str(record, "location");

    let (latitude, longitude) = match extract_coordinates(record) {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => match config.coordinates {
            Fallback::Null => (None, None),
            Fallback::Drop => {
                dropped.missing_coordinates += 1;
                return Ok(None);
            }
            Fallback::Fail => {
                return Err(TransformError::MissingCoordinates {
                    location: location.unwrap_or_default(),
                });
            }
        },
    };

    let timestamp = match extract_date_text(record) {
        Some(text) => match parse_utc(text) {
            Ok(ts) => ts,
            Err(e) => match config.timestamp {
                Fallback::Fail => return Err(e),
                Fallback::Drop | Fallback::Null => {
                    dropped.bad_timestamp += 1;
                    return Ok(None);
                }
            },
        },
        None => {
            dropped.missing_field += 1;
            return Ok(None);
        }
    };

    let Some(value) = extract_value(record) else {
        dropped.missing_field += 1;
        return Ok(None);
    };
    // NaN and infinities ("inf", "1e400") count as unusable readings.
    if !(value.is_finite() && value > 0.0) {
        dropped.non_positive += 1;
        return Ok(None);
    }

    let (Some(location), Some(unit)) = (location, non_empty_str(record, "unit")) else {
        dropped.missing_field += 1;
        return Ok(None);
    };

    Ok(Some(Measurement {
        location,
        parameter: PARAM_PM25.to_string(),
        value,
        unit,
        latitude,
        longitude,
        timestamp,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
