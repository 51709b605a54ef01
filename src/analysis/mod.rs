//! Read-only derivations over the persisted measurements.
//!
//! Submodules:
//! - `snapshot` — the in-memory copy of the table a dashboard session works on.
//! - `views`    — pure functions from a snapshot to each dashboard view.

pub mod snapshot;
pub mod views;
