//! Interactive dashboard session.
//!
//! Each command adjusts one parameter (or reloads the snapshot) and the
//! whole dashboard is derived again from the session snapshot.

use super::{Dashboard, ViewParams};
use crate::analysis::snapshot::SnapshotCache;
use crate::config::DashboardConfig;
use crate::model::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Top(u32),
    Threshold(u32),
    Location(String),
    Refresh,
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  top N          show the N most polluted locations
  threshold T    map readings at or above T µg/m³
  location NAME  gauge for one location
  refresh        reload the table from disk
  show           redraw the dashboard
  quit           leave";

/// Parse one input line. Blank lines redraw.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let number = |what: &str| -> Result<u32, String> {
        rest.parse::<u32>()
            .map_err(|_| format!("{} expects a whole number, got '{}'", what, rest))
    };

    match word.to_ascii_lowercase().as_str() {
        "" | "show" => Ok(Command::Show),
        "top" => number("top").map(Command::Top),
        "threshold" => number("threshold").map(Command::Threshold),
        "location" if !rest.is_empty() => Ok(Command::Location(rest.to_string())),
        "location" => Err("location expects a name".to_string()),
        "refresh" => Ok(Command::Refresh),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{}' (try 'help')", other)),
    }
}

pub struct Session {
    cache: SnapshotCache,
    config: DashboardConfig,
    params: ViewParams,
}

impl Session {
    pub fn new(cache: SnapshotCache, config: DashboardConfig, params: ViewParams) -> Self {
        Self { cache, config, params }
    }

    pub fn params(&self) -> &ViewParams {
        &self.params
    }

    /// Whether the store on disk has changed since the snapshot was taken.
    pub fn store_changed(&self) -> bool {
        self.cache.is_stale()
    }

    /// Apply a command. `Quit` and `Help` leave the session unchanged.
    ///
    /// Returns a notice for the prompt when the command was refused; a
    /// location missing from the snapshot keeps the current selection.
    pub fn apply(&mut self, command: Command) -> Result<Option<String>, StoreError> {
        match command {
            Command::Top(n) => self.params.top_n = n,
            Command::Threshold(t) => self.params.threshold = t,
            Command::Location(name) => {
                let snapshot = self.cache.get()?;
                if !snapshot.rows().iter().any(|m| m.location == name) {
                    return Ok(Some(format!("unknown location '{}'", name)));
                }
                self.params.location = Some(name);
            }
            Command::Refresh => {
                let rows = self.cache.refresh()?.len();
                log::info!(target: crate::logging::PRESENTER, "Reloaded {} rows", rows);
            }
            Command::Show | Command::Help | Command::Quit => {}
        }
        Ok(None)
    }

    /// Derive the dashboard for the current parameters.
    pub fn dashboard(&mut self) -> Result<Dashboard, StoreError> {
        let snapshot = self.cache.get()?;
        self.params = self.params.clone().normalized(&self.config, snapshot);
        Ok(Dashboard::build(snapshot, &self.params))
    }
}
