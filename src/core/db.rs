use crate::core::error;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn db_connect(db_path: &Path, busy_timeout_ms: u64) -> Result<Connection, error::FleetError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(error::FleetError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::FleetError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::FleetError::RusqliteError)?;
    Ok(conn)
}

pub fn fleet_db_path(root: &Path) -> PathBuf {
    root.join(schemas::FLEET_DB_NAME)
}

/// Fail early with a clear message when the store root cannot hold a database.
pub fn storage_health_preflight(root: &Path) -> Result<(), error::FleetError> {
    let probe = root.join(".fleetstore.preflight");
    fs::create_dir_all(root)
        .and_then(|_| fs::write(&probe, b"ok"))
        .and_then(|_| fs::remove_file(&probe))
        .map_err(|e| {
            error::FleetError::ValidationError(format!(
                "STORAGE_PREFLIGHT_FAILED: store root {} is not writable: {}",
                root.display(),
                e
            ))
        })
}

pub fn ensure_schema(conn: &Connection) -> Result<(), error::FleetError> {
    conn.execute(schemas::FLEET_DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(error::FleetError::RusqliteError)?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version >= schemas::FLEET_SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute(schemas::FLEET_DB_SCHEMA_HOSTS, [])?;
    conn.execute(schemas::FLEET_DB_SCHEMA_QUERIES, [])?;
    conn.execute(schemas::FLEET_DB_SCHEMA_LABELS, [])?;
    conn.execute(schemas::FLEET_DB_SCHEMA_LABEL_MEMBERSHIP, [])?;
    conn.execute(schemas::FLEET_DB_SCHEMA_INDEX_MEMBERSHIP_HOST, [])?;
    conn.execute(schemas::FLEET_DB_SCHEMA_QUERY_RESULTS, [])?;
    conn.execute(schemas::FLEET_DB_SCHEMA_INDEX_RESULTS_QUERY_HOST, [])?;
    conn.execute(schemas::FLEET_DB_SEED_ALL_HOSTS, [])?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::FLEET_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_schema_is_idempotent_and_seeds_all_hosts() {
        let tmp = tempdir().unwrap();
        let conn = db_connect(&fleet_db_path(tmp.path()), 1_000).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let builtin: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM labels WHERE name = ?1 AND label_type = 'builtin'",
                [schemas::ALL_HOSTS_LABEL_NAME],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(builtin, 1);
    }
}
