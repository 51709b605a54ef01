/// OpenAQ measurements API client
///
/// Retrieves the current day's air quality measurements from the OpenAQ v2
/// `/measurements` endpoint. One request per run: the first page only,
/// no retry and no backoff. The raw records are returned untouched for the
/// transform step.
///
/// API Documentation: https://docs.openaq.org/

use crate::config::{ApiConfig, ConfigError};
use crate::model::FetchError;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

/// A raw measurement record exactly as received: heterogeneous, nested,
/// possibly missing fields.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

const API_KEY_HEADER: &str = "x-api-key";

// ============================================================================
// Source seam
// ============================================================================

/// Anything that can produce a day's raw measurement records.
pub trait MeasurementSource {
    fn fetch(&self, date: NaiveDate) -> Result<Vec<RawRecord>, FetchError>;
}

// ============================================================================
// Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct MeasurementsResponse {
    results: Vec<serde_json::Value>,
}

// ============================================================================
// URL Building and Parsing
// ============================================================================

/// Build the measurements URL for `date`.
///
/// # Example
/// `https://api.openaq.org/v2/measurements?limit=1000&page=1&date_from=2024-01-01&order_by=datetime`
pub fn build_measurements_url(config: &ApiConfig, date: NaiveDate) -> String {
    format!(
        "{}?limit={}&page={}&date_from={}&order_by={}",
        config.endpoint,
        config.limit,
        config.page,
        date.format("%Y-%m-%d"),
        config.order_by
    )
}

/// Extract the `results` array from a response body.
///
/// A body that is not JSON, lacks `results`, or holds non-object entries is
/// a transport-level failure: the server did not return what it promised.
pub fn parse_measurements_response(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let response: MeasurementsResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Transport(format!("Malformed response body: {}", e)))?;

    response
        .results
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(FetchError::Transport(format!(
                "results[{}] is not an object: {}",
                i, other
            ))),
        })
        .collect()
}

// ============================================================================
// API Client
// ============================================================================

pub struct OpenAqClient {
    http: reqwest::blocking::Client,
    config: ApiConfig,
}

impl OpenAqClient {
    /// Build a client with the API key installed as a default header.
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let key = config.require_api_key()?;

        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| ConfigError::Invalid(format!("api.api_key: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self { http, config: config.clone() })
    }
}

impl MeasurementSource for OpenAqClient {
    fn fetch(&self, date: NaiveDate) -> Result<Vec<RawRecord>, FetchError> {
        let url = build_measurements_url(&self.config, date);
        log::debug!(target: crate::logging::FETCH, "GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Http { status: status.as_u16(), body });
        }

        let records = parse_measurements_response(&body)?;
        log::info!(target: crate::logging::FETCH, "Fetched {} raw records", records.len());
        Ok(records)
    }
}

// ============================================================================
// Tests
// ============================================================================
