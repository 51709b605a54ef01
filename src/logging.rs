/// Structured logging for the air quality service
///
/// Backend for the `log` facade. Every record is tagged with the pipeline
/// stage it came from (the log target: `fetch`, `transform`, `load`,
/// `presenter`, `system`).
/// Supports console output and file-based logging for scheduled runs.

use crate::ingest::pipeline::IngestReport;
use crate::model::PipelineError;
use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

pub const FETCH: &str = "fetch";
pub const TRANSFORM: &str = "transform";
pub const LOAD: &str = "load";
pub const PRESENTER: &str = "presenter";
pub const SYSTEM: &str = "system";

/// Short console label for a target; targets outside the service (reqwest,
/// rusqlite) are shown as-is.
fn target_label(target: &str) -> &str {
    match target {
        FETCH => "FETCH",
        TRANSFORM => "XFORM",
        LOAD => "LOAD",
        PRESENTER => "DASH",
        SYSTEM => "SYS",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Transient - running the job again may succeed
    Retryable,
    /// Bad input, bad configuration, or a rejected request
    Terminal,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Retryable => write!(f, "RETRYABLE"),
            FailureType::Terminal => write!(f, "TERMINAL"),
        }
    }
}

pub fn classify_failure(err: &PipelineError) -> FailureType {
    if err.is_retryable() {
        FailureType::Retryable
    } else {
        FailureType::Terminal
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

pub struct Logger {
    /// Minimum level to emit
    min_level: LevelFilter,
    /// Optional file path for logging
    log_file: Option<PathBuf>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
    /// Serializes file appends
    file_lock: Mutex<()>,
}

impl Logger {
    pub fn new(min_level: LevelFilter, log_file: Option<PathBuf>, console_timestamps: bool) -> Self {
        Self { min_level, log_file, console_timestamps, file_lock: Mutex::new(()) }
    }

    fn format_entry(record: &Record) -> String {
        format!(
            "{} {} {}: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            record.level(),
            target_label(record.target()),
            record.args()
        )
    }

    fn append_to_file(&self, path: &PathBuf, entry: &str) -> std::io::Result<()> {
        let _guard = self.file_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.min_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let log_entry = Self::format_entry(record);
        let label = target_label(record.target());

        if self.console_timestamps {
            match record.level() {
                Level::Error | Level::Warn => eprintln!("{}", log_entry),
                _ => println!("{}", log_entry),
            }
        } else {
            match record.level() {
                Level::Error => eprintln!("   ✗ {}: {}", label, record.args()),
                Level::Warn => eprintln!("   ⚠ {}: {}", label, record.args()),
                Level::Info => println!("   {}", record.args()),
                Level::Debug | Level::Trace => println!("   [{}] {}", record.level(), record.args()),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = self.append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path.display(), e);
            }
        }
    }

    fn flush(&self) {}
}

/// Parse a level name from configuration; unknown names fall back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}

/// Install the service logger as the global `log` backend.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_logger(min_level: LevelFilter, log_file: Option<PathBuf>, console_timestamps: bool) {
    let logger = Logger::new(min_level, log_file, console_timestamps);
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(min_level);
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed ingestion run with its stage and classification.
pub fn log_stage_failure(err: &PipelineError) {
    let failure_type = classify_failure(err);
    let target = match err.stage() {
        crate::model::Stage::Config => SYSTEM,
        crate::model::Stage::Fetch => FETCH,
        crate::model::Stage::Transform => TRANSFORM,
        crate::model::Stage::Load => LOAD,
    };
    let message = format!("{} failed [{}]: {}", err.stage(), failure_type, err);

    match failure_type {
        FailureType::Retryable => log::warn!(target: target, "{}", message),
        FailureType::Terminal => log::error!(target: target, "{}", message),
    }
}

// ---------------------------------------------------------------------------
// Ingest Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a completed ingestion run
pub fn log_ingest_summary(report: &IngestReport) {
    let drops = &report.dropped;
    let message = format!(
        "Ingest complete: {} fetched, {} kept, {} loaded ({} other pollutant, {} non-positive, {} incomplete, {} no coordinates, {} bad timestamp)",
        report.fetched,
        report.kept,
        report.loaded,
        drops.other_parameter,
        drops.non_positive,
        drops.missing_field,
        drops.missing_coordinates,
        drops.bad_timestamp,
    );

    if report.loaded == 0 {
        log::warn!(target: LOAD, "{} - table is now empty", message);
    } else {
        log::info!(target: LOAD, "{}", message);
    }
}
