//! Capacity Governor: the hard per-query cap on payload-bearing result rows.
//!
//! Admission is "count then admit" inside the caller's write transaction:
//! the current count is read with the same transaction that performs the
//! insert, and the write lock taken by `BEGIN IMMEDIATE` keeps another writer
//! from slipping rows in between. Placeholder rows (no payload) cost nothing
//! and are always admitted. Payload rows beyond the remaining budget are
//! dropped, never queued and never reported as an error.

use crate::core::error::FleetError;
use crate::datastore::results::ResultRow;
use crate::datastore::{HostId, QueryId};
use rusqlite::{Connection, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityGovernor {
    max_rows: usize,
}

/// Outcome of admitting one batch for a single query.
#[derive(Debug)]
pub struct Admission<'r> {
    /// Rows to insert, in input order.
    pub admitted: Vec<&'r ResultRow>,
    /// Payload rows cut off by the cap.
    pub dropped: usize,
}

impl CapacityGovernor {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// How many of `candidates` payload rows fit on top of `current`.
    pub fn admit(&self, current: usize, candidates: usize) -> usize {
        candidates.min(self.max_rows.saturating_sub(current))
    }

    /// Split a batch into admitted rows and a dropped count.
    ///
    /// The admitted payload rows are the first ones in input order.
    pub fn admit_rows<'r>(&self, current: usize, rows: &[&'r ResultRow]) -> Admission<'r> {
        let candidates = rows.iter().filter(|r| r.has_payload()).count();
        let mut budget = self.admit(current, candidates);
        let dropped = candidates - budget;

        let mut admitted = Vec::with_capacity(rows.len() - dropped);
        for row in rows {
            if !row.has_payload() {
                admitted.push(*row);
            } else if budget > 0 {
                budget -= 1;
                admitted.push(*row);
            }
        }
        Admission { admitted, dropped }
    }
}

/// Payload-bearing rows currently stored for a query.
pub fn payload_count(conn: &Connection, query_id: QueryId) -> Result<usize, FleetError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM query_results WHERE query_id = ?1 AND data IS NOT NULL",
        params![query_id],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Payload-bearing rows currently stored for one host's answers to a query.
pub fn payload_count_for_host(
    conn: &Connection,
    query_id: QueryId,
    host_id: HostId,
) -> Result<usize, FleetError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM query_results
         WHERE query_id = ?1 AND host_id = ?2 AND data IS NOT NULL",
        params![query_id, host_id],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}
