//! Concentration bands and the alert view built on them.

pub mod thresholds;
