/// Core data types for the PM2.5 air quality service.
///
/// This module defines the shared domain model imported by all other modules:
/// the `Measurement` row that flows from the ingestor into the store and back
/// out to the dashboard, and the error kinds for each pipeline stage.
/// It contains no logic and no I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Parameter codes
// ---------------------------------------------------------------------------

/// OpenAQ parameter code for fine particulate matter (≤ 2.5 µm).
pub const PARAM_PM25: &str = "pm25";

/// Unit OpenAQ reports PM2.5 concentrations in.
pub const UNIT_UG_M3: &str = "µg/m³";

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// A single ingested PM2.5 reading.
///
/// One row of the `quality` table. `parameter` is always `PARAM_PM25` and
/// `value` is always strictly positive once a row has passed the transform
/// step. Coordinates are `None` when the source record had none usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub location: String,
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    /// Both coordinates are present, so the row can be placed on a map.
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from the fetch step.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Non-2xx HTTP response from the OpenAQ API.
    Http { status: u16, body: String },
    /// The request never produced a usable response: connection failure,
    /// timeout, or a body that is not the expected JSON document.
    Transport(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http { status, body } => write!(f, "HTTP error {}: {}", status, body),
            FetchError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors from the transform step. Any of these aborts the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    /// No record in the batch carries this required field.
    MissingField { field: String },
    /// A record's date could not be parsed as a UTC instant.
    InvalidTimestamp { value: String, reason: String },
    /// A record lacked coordinates and the coordinate fallback is `fail`.
    MissingCoordinates { location: String },
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::MissingField { field } => {
                write!(f, "Required field '{}' missing from every record", field)
            }
            TransformError::InvalidTimestamp { value, reason } => {
                write!(f, "Invalid timestamp '{}': {}", value, reason)
            }
            TransformError::MissingCoordinates { location } => {
                write!(f, "Missing coordinates for location: {}", location)
            }
        }
    }
}

impl std::error::Error for TransformError {}

/// Errors reading or writing the SQLite store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Sqlite(String),
    Io(String),
    /// The database file does not exist (no ingestion has run yet).
    NotFound(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(msg) => write!(f, "SQLite error: {}", msg),
            StoreError::Io(msg) => write!(f, "I/O error: {}", msg),
            StoreError::NotFound(path) => write!(f, "Database not found: {}", path),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// Pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Fetch,
    Transform,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Config => write!(f, "config"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Transform => write!(f, "transform"),
            Stage::Load => write!(f, "load"),
        }
    }
}

/// Any failure of an ingestion run, tagged by stage.
#[derive(Debug)]
pub enum PipelineError {
    Config(crate::config::ConfigError),
    Fetch(FetchError),
    Transform(TransformError),
    Load(StoreError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Config,
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::Transform(_) => Stage::Transform,
            PipelineError::Load(_) => Stage::Load,
        }
    }

    /// Whether running the same job again could plausibly succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// client errors, bad data and configuration are not. Nothing in the
    /// service retries on its own; this only informs the operator.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Fetch(FetchError::Transport(_)) => true,
            PipelineError::Fetch(FetchError::Http { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "{}", e),
            PipelineError::Fetch(e) => write!(f, "{}", e),
            PipelineError::Transform(e) => write!(f, "{}", e),
            PipelineError::Load(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<crate::config::ConfigError> for PipelineError {
    fn from(e: crate::config::ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

impl From<FetchError> for PipelineError {
    fn from(e: FetchError) -> Self {
        PipelineError::Fetch(e)
    }
}

impl From<TransformError> for PipelineError {
    fn from(e: TransformError) -> Self {
        PipelineError::Transform(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Load(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_and_server_errors_are_retryable() {
        assert!(PipelineError::Fetch(FetchError::Transport("timed out".into())).is_retryable());
        assert!(
            PipelineError::Fetch(FetchError::Http { status: 503, body: String::new() })
                .is_retryable()
        );
        assert!(
            PipelineError::Fetch(FetchError::Http { status: 429, body: String::new() })
                .is_retryable()
        );
    }

    #[test]
    fn test_validation_errors_are_terminal() {
        let unauthorized = PipelineError::Fetch(FetchError::Http {
            status: 401,
            body: "invalid key".into(),
        });
        assert!(!unauthorized.is_retryable());
        assert_eq!(unauthorized.stage(), Stage::Fetch);

        let bad_date = PipelineError::from(TransformError::InvalidTimestamp {
            value: "yesterday".into(),
            reason: "input contains invalid characters".into(),
        });
        assert!(!bad_date.is_retryable());
        assert_eq!(bad_date.stage(), Stage::Transform);

        let rename_failed = PipelineError::from(StoreError::Io("permission denied".into()));
        assert!(!rename_failed.is_retryable());
        assert_eq!(rename_failed.stage(), Stage::Load);
    }

    #[test]
    fn test_http_error_display_carries_status_and_body() {
        let err = FetchError::Http { status: 401, body: "Unauthorized".into() };
        assert_eq!(err.to_string(), "HTTP error 401: Unauthorized");
    }
}
