//! PM2.5 air quality service.
//!
//! Two processes share one SQLite file:
//!
//! - the ingestor (`aqmon-ingest`) pulls today's measurements from OpenAQ,
//!   keeps the valid PM2.5 readings and replaces the `quality` table;
//! - the dashboard (`aqmon-dashboard`) loads the table once per session and
//!   derives rankings, a map, summary statistics, a gauge and alerts.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod store;
