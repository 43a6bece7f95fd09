//! Hosts and scheduled queries.
//!
//! These records are owned by outside collaborators (enrollment, query
//! management). Only the fields the label and result subsystems reference
//! are kept. Deleting a host or query never cascades: memberships are swept
//! by `labels::cleanup_orphan_label_membership` and result rows outlive
//! their query.

use crate::core::error::FleetError;
use crate::core::store::{DEFAULT_ACTOR, Store};
use crate::core::time::Timestamp;
use crate::datastore::{HostId, QueryId};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: HostId,
    pub hostname: String,
    pub platform: String,
    pub os_version: String,
    /// When label membership was last reconciled; 0 means never.
    pub label_updated_at: Timestamp,
}

pub(crate) const HOST_COLUMNS: &str = "h.id, h.hostname, h.platform, h.os_version, h.label_updated_at";

pub(crate) fn host_from_row(row: &Row<'_>) -> rusqlite::Result<Host> {
    Ok(Host {
        id: row.get(0)?,
        hostname: row.get(1)?,
        platform: row.get(2)?,
        os_version: row.get(3)?,
        label_updated_at: row.get(4)?,
    })
}

/// Register a host, or refresh platform details of an existing hostname.
pub fn enroll_host(
    store: &Store,
    hostname: &str,
    platform: &str,
    os_version: &str,
) -> Result<Host, FleetError> {
    if hostname.trim().is_empty() {
        return Err(FleetError::ValidationError(
            "hostname must not be empty".into(),
        ));
    }

    store
        .broker()
        .with_tx(DEFAULT_ACTOR, "hosts.enroll", |tx| {
            tx.execute(
                "INSERT INTO hosts(hostname, platform, os_version) VALUES(?1, ?2, ?3)
                 ON CONFLICT(hostname) DO UPDATE SET
                     platform = excluded.platform,
                     os_version = excluded.os_version",
                params![hostname, platform, os_version],
            )?;
            let host = tx.query_row(
                &format!("SELECT {HOST_COLUMNS} FROM hosts h WHERE h.hostname = ?1"),
                params![hostname],
                host_from_row,
            )?;
            Ok(host)
        })
}

pub fn get_host(store: &Store, id: HostId) -> Result<Host, FleetError> {
    store
        .broker()
        .with_read("hosts.get", |conn| {
            conn.query_row(
                &format!("SELECT {HOST_COLUMNS} FROM hosts h WHERE h.id = ?1"),
                params![id],
                host_from_row,
            )
            .optional()
            .map_err(FleetError::RusqliteError)
        })?
        .ok_or_else(|| FleetError::NotFound(format!("host {}", id)))
}

pub fn delete_host(store: &Store, id: HostId) -> Result<(), FleetError> {
    let deleted = store
        .broker()
        .with_tx(DEFAULT_ACTOR, "hosts.delete", |tx| {
            Ok(tx.execute("DELETE FROM hosts WHERE id = ?1", params![id])?)
        })?;
    if deleted == 0 {
        return Err(FleetError::NotFound(format!("host {}", id)));
    }
    Ok(())
}

pub fn new_query(store: &Store, name: &str, query: &str) -> Result<QueryId, FleetError> {
    if name.trim().is_empty() {
        return Err(FleetError::ValidationError(
            "query name must not be empty".into(),
        ));
    }

    store
        .broker()
        .with_tx(DEFAULT_ACTOR, "queries.new", |tx| {
            tx.execute(
                "INSERT INTO queries(name, query) VALUES(?1, ?2)",
                params![name, query],
            )?;
            Ok(tx.last_insert_rowid())
        })
}

/// Delete a query definition. Its result rows are left in place.
pub fn delete_query(store: &Store, id: QueryId) -> Result<(), FleetError> {
    let deleted = store
        .broker()
        .with_tx(DEFAULT_ACTOR, "queries.delete", |tx| {
            Ok(tx.execute("DELETE FROM queries WHERE id = ?1", params![id])?)
        })?;
    if deleted == 0 {
        return Err(FleetError::NotFound(format!("query {}", id)));
    }
    Ok(())
}
