//! Ingestion: fetch, normalize, and persist PM2.5 measurements.
//!
//! Submodules:
//! - `openaq`    — HTTP client for the OpenAQ measurements endpoint.
//! - `transform` — flattens and filters raw records into `Measurement`s.
//! - `pipeline`  — runs fetch → transform → load as one job.

pub mod openaq;
pub mod pipeline;
pub mod transform;
