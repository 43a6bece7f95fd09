//! Centralized database schema definitions for the fleet store.
//!
//! Everything lives in one SQLite database (`fleet.db`):
//! 1. Inventory: hosts and scheduled queries (owned by outside collaborators).
//! 2. Labels: label definitions and the `label_membership` association table.
//! 3. Results: `query_results`, the bounded per-query report rows.

pub const FLEET_DB_NAME: &str = "fleet.db";
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";
pub const FLEET_SCHEMA_VERSION: u32 = 1;

pub const FLEET_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

// --- 1. Inventory ---

pub const FLEET_DB_SCHEMA_HOSTS: &str = "
    CREATE TABLE IF NOT EXISTS hosts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hostname TEXT NOT NULL UNIQUE,
        platform TEXT NOT NULL DEFAULT '',
        os_version TEXT NOT NULL DEFAULT '',
        label_updated_at INTEGER NOT NULL DEFAULT 0
    )
";

pub const FLEET_DB_SCHEMA_QUERIES: &str = "
    CREATE TABLE IF NOT EXISTS queries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        query TEXT NOT NULL
    )
";

// --- 2. Labels ---

pub const FLEET_DB_SCHEMA_LABELS: &str = "
    CREATE TABLE IF NOT EXISTS labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        query TEXT NOT NULL DEFAULT '',
        platform TEXT NOT NULL DEFAULT '',
        label_type TEXT NOT NULL DEFAULT 'regular', -- regular | builtin
        label_membership_type TEXT NOT NULL DEFAULT 'dynamic' -- dynamic | manual
    )
";

// No foreign keys: references are checked by the reconciler and orphans are
// swept by `cleanup_orphan_label_membership`.
pub const FLEET_DB_SCHEMA_LABEL_MEMBERSHIP: &str = "
    CREATE TABLE IF NOT EXISTS label_membership (
        label_id INTEGER NOT NULL,
        host_id INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (label_id, host_id)
    )
";
pub const FLEET_DB_SCHEMA_INDEX_MEMBERSHIP_HOST: &str =
    "CREATE INDEX IF NOT EXISTS idx_label_membership_host ON label_membership(host_id)";

pub const ALL_HOSTS_LABEL_NAME: &str = "All Hosts";

pub const FLEET_DB_SEED_ALL_HOSTS: &str = "
    INSERT OR IGNORE INTO labels(name, description, query, platform, label_type, label_membership_type)
    VALUES('All Hosts', 'All hosts which have enrolled', 'SELECT 1', '', 'builtin', 'dynamic')
";

// --- 3. Results ---

// `data` NULL marks a placeholder row: the host answered with nothing.
pub const FLEET_DB_SCHEMA_QUERY_RESULTS: &str = "
    CREATE TABLE IF NOT EXISTS query_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        query_id INTEGER NOT NULL,
        host_id INTEGER NOT NULL,
        last_fetched INTEGER NOT NULL,
        data BLOB
    )
";
pub const FLEET_DB_SCHEMA_INDEX_RESULTS_QUERY_HOST: &str =
    "CREATE INDEX IF NOT EXISTS idx_query_results_query_host ON query_results(query_id, host_id)";
