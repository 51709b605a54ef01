//! Console dashboard over the local PM2.5 table.

use aqmon_service::analysis::snapshot::SnapshotCache;
use aqmon_service::config::{Config, DEFAULT_CONFIG_PATH};
use aqmon_service::dashboard::session::{self, Command, Session};
use aqmon_service::dashboard::{ViewParams, render_text};
use aqmon_service::logging;
use clap::Parser;
use std::error::Error;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aqmon-dashboard")]
#[command(about = "PM2.5 rankings, map, statistics, gauge and alerts")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Database file, overriding store.path
    #[arg(long)]
    db: Option<PathBuf>,
    /// Number of locations in the ranking
    #[arg(long)]
    top: Option<u32>,
    /// Map threshold in µg/m³
    #[arg(long)]
    threshold: Option<u32>,
    /// Location shown on the gauge
    #[arg(long)]
    location: Option<String>,
    /// Print the dashboard as JSON
    #[arg(long, conflicts_with = "interactive")]
    json: bool,
    /// Read commands from stdin and redraw after each one
    #[arg(long, short)]
    interactive: bool,
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&cli.config)?;
    logging::init_logger(
        logging::parse_level(&config.logging.level),
        config.logging.file.clone(),
        config.logging.timestamps,
    );

    let db = cli.db.unwrap_or_else(|| config.store.path.clone());
    let mut params = ViewParams::defaults(&config.dashboard);
    if let Some(n) = cli.top {
        params.top_n = n;
    }
    if let Some(t) = cli.threshold {
        params.threshold = t;
    }
    params.location = cli.location;

    let mut session = Session::new(SnapshotCache::new(db), config.dashboard.clone(), params);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&session.dashboard()?)?);
        return Ok(());
    }

    println!("{}", render_text(&session.dashboard()?));
    if !cli.interactive {
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        if session.store_changed() {
            println!("(the table has been replaced since it was loaded; type 'refresh')");
        }
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match session::parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => println!("{}", session::HELP),
            Ok(command) => match session.apply(command)? {
                Some(notice) => println!("{}", notice),
                None => println!("{}", render_text(&session.dashboard()?)),
            },
            Err(msg) => println!("{}", msg),
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("aqmon-dashboard: {}", e);
            ExitCode::FAILURE
        }
    }
}
