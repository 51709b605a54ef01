//! One-shot ingestion job: fetch today's OpenAQ measurements, keep the
//! PM2.5 readings, and replace the local table with them.

use aqmon_service::config::{Config, DEFAULT_CONFIG_PATH};
use aqmon_service::ingest::openaq::OpenAqClient;
use aqmon_service::ingest::pipeline;
use aqmon_service::logging::{self, LOAD, SYSTEM};
use aqmon_service::model::PipelineError;
use aqmon_service::store;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

const PREVIEW_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "aqmon-ingest")]
#[command(about = "Fetch today's PM2.5 measurements and replace the local table")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Database file, overriding store.path
    #[arg(long)]
    db: Option<PathBuf>,
    /// Day to fetch (YYYY-MM-DD); defaults to today in UTC
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let mut config = Config::load(&cli.config)?;
    if let Some(db) = cli.db {
        config.store.path = db;
    }

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        logging::parse_level(&config.logging.level)
    };
    logging::init_logger(level, config.logging.file.clone(), config.logging.timestamps);

    let date = cli.date.unwrap_or_else(|| Utc::now().date_naive());
    log::info!(target: SYSTEM, "Ingesting PM2.5 measurements for {}", date);

    let client = OpenAqClient::new(&config.api)?;
    let report = pipeline::run(&client, &config, date)?;
    logging::log_ingest_summary(&report);

    match store::preview(&config.store.path, PREVIEW_ROWS) {
        Ok(rows) => {
            for m in rows {
                log::info!(
                    target: LOAD,
                    "  {:<28} {:>8.2} {}  {}",
                    m.location,
                    m.value,
                    m.unit,
                    m.timestamp.to_rfc3339()
                );
            }
        }
        Err(e) => log::warn!(target: LOAD, "Could not preview stored rows: {}", e),
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Configuration errors can happen before the logger exists.
            if matches!(e, PipelineError::Config(_)) {
                logging::init_logger(
                    if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info },
                    None,
                    false,
                );
            }
            logging::log_stage_failure(&e);
            ExitCode::FAILURE
        }
    }
}
