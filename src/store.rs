//! SQLite persistence for the `quality` table.
//!
//! The whole database is one table and is rebuilt on every ingestion run.
//! `replace_all` writes a complete new database next to the target and
//! renames it into place, so a reader opening the file sees either the
//! previous run's table or the new one, never a half-written one.

use crate::model::{Measurement, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row, params};
use std::path::{Path, PathBuf};

pub const TABLE: &str = "quality";

const SCHEMA: &str = "
    CREATE TABLE quality (
        location TEXT NOT NULL,
        parameter TEXT NOT NULL,
        pm25_value REAL NOT NULL,
        unit TEXT NOT NULL,
        latitude REAL,
        longitude REAL,
        datetime_utc TIMESTAMP NOT NULL
    );
";

const SELECT_ALL: &str = "
    SELECT location, parameter, pm25_value, unit, latitude, longitude, datetime_utc
    FROM quality
    ORDER BY rowid
";

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn measurement_from_row(row: &Row) -> rusqlite::Result<Measurement> {
    Ok(Measurement {
        location: row.get(0)?,
        parameter: row.get(1)?,
        value: row.get(2)?,
        unit: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        timestamp: row.get::<_, DateTime<Utc>>(6)?,
    })
}

/// Replace the persisted table with exactly `rows`.
///
/// Nothing from a previous run survives. The target file is only touched
/// by the final rename; any failure before that leaves it as it was.
/// Returns the row count read back from the new table.
pub fn replace_all(path: &Path, rows: &[Measurement]) -> Result<usize, StoreError> {
    let staging = staging_path(path);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }

    let written = match write_database(&staging, rows) {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
    };

    std::fs::rename(&staging, path)?;
    log::info!(
        target: crate::logging::LOAD,
        "Replaced {} with {} records",
        path.display(),
        written
    );
    Ok(written)
}

/// Build a fresh database at `path`. The connection is closed when this
/// returns, whether or not it succeeded.
fn write_database(path: &Path, rows: &[Measurement]) -> Result<usize, StoreError> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO quality (location, parameter, pm25_value, unit, latitude, longitude, datetime_utc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for m in rows {
            insert.execute(params![
                m.location,
                m.parameter,
                m.value,
                m.unit,
                m.latitude,
                m.longitude,
                m.timestamp,
            ])?;
        }
    }
    tx.commit()?;

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM quality", [], |row| row.get(0))?;
    conn.close().map_err(|(_, e)| StoreError::from(e))?;
    Ok(count as usize)
}

fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.display().to_string()));
    }
    Ok(Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?)
}

/// Read every row, in insertion order.
pub fn load_all(path: &Path) -> Result<Vec<Measurement>, StoreError> {
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(SELECT_ALL)?;
    let rows = stmt
        .query_map([], measurement_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The first `limit` rows, for the ingest run's console preview.
pub fn preview(path: &Path, limit: usize) -> Result<Vec<Measurement>, StoreError> {
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(&format!("{} LIMIT ?1", SELECT_ALL))?;
    let rows = stmt
        .query_map([limit as i64], measurement_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn measurement(location: &str, value: f64, coords: Option<(f64, f64)>) -> Measurement {
        Measurement {
            location: location.to_string(),
            parameter: "pm25".to_string(),
            value,
            unit: "µg/m³".to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 6, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_replace_then_load_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");
        let rows = vec![
            measurement("Kathmandu", 88.2, Some((27.7, 85.3))),
            measurement("Lalitpur", 41.0, None),
        ];

        assert_eq!(replace_all(&path, &rows).unwrap(), 2);
        assert_eq!(load_all(&path).unwrap(), rows);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_replace_drops_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");

        replace_all(&path, &[measurement("Old", 10.0, None), measurement("Old", 11.0, None)]).unwrap();
        replace_all(&path, &[measurement("New", 20.0, None)]).unwrap();

        let rows = load_all(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, "New");
    }

    #[test]
    fn test_replace_with_nothing_leaves_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");

        replace_all(&path, &[measurement("Old", 10.0, None)]).unwrap();
        assert_eq!(replace_all(&path, &[]).unwrap(), 0);
        assert!(load_all(&path).unwrap().is_empty());
    }

    #[test]
    fn test_stale_staging_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");
        std::fs::write(staging_path(&path), b"left over from a crashed run").unwrap();

        replace_all(&path, &[measurement("A", 1.0, None)]).unwrap();
        assert_eq!(load_all(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowhere.db");
        assert!(matches!(load_all(&path), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_preview_limits_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.db");
        let rows: Vec<_> = (1..=8).map(|i| measurement("A", i as f64, None)).collect();
        replace_all(&path, &rows).unwrap();

        let head = preview(&path, 5).unwrap();
        assert_eq!(head.len(), 5);
        assert_eq!(head[0].value, 1.0);
    }
}
