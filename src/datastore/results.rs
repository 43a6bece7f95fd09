//! Scheduled-query result rows: bounded ingestion and reads.
//!
//! Payloads are opaque bytes and are never inspected. A row without a
//! payload is a placeholder ("the host answered with nothing"): it is stored
//! and returned by per-host reads, but never counted and never returned by
//! per-query reads.

use crate::core::error::FleetError;
use crate::core::statement::{self, Statement, StatementSink};
use crate::core::store::{DEFAULT_ACTOR, Store};
use crate::core::time::Timestamp;
use crate::datastore::capacity::{self, CapacityGovernor};
use crate::datastore::{HostId, QueryId};
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::BTreeMap;

const RESULT_COLUMNS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub query_id: QueryId,
    pub host_id: HostId,
    pub last_fetched: Timestamp,
    pub data: Option<Vec<u8>>,
}

impl ResultRow {
    pub fn new(query_id: QueryId, host_id: HostId, last_fetched: Timestamp, data: Vec<u8>) -> Self {
        Self {
            query_id,
            host_id,
            last_fetched,
            data: Some(data),
        }
    }

    pub fn placeholder(query_id: QueryId, host_id: HostId, last_fetched: Timestamp) -> Self {
        Self {
            query_id,
            host_id,
            last_fetched,
            data: None,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.data.is_some()
    }
}

/// What an ingestion call stored. Dropped rows are not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub dropped: usize,
}

impl IngestReport {
    fn add(&mut self, inserted: usize, dropped: usize) {
        self.inserted += inserted;
        self.dropped += dropped;
    }
}

/// Append rows, admitting per query only what fits under the cap.
///
/// Rows may reference queries or hosts that no longer exist; they are
/// stored anyway and left for a later cleanup.
pub fn save_query_result_rows(store: &Store, rows: &[ResultRow]) -> Result<IngestReport, FleetError> {
    if rows.is_empty() {
        return Ok(IngestReport::default());
    }
    let governor = CapacityGovernor::new(store.max_rows());
    let by_query = group_by_query(rows);

    store
        .broker()
        .with_tx(DEFAULT_ACTOR, "results.save", |tx| {
            let mut report = IngestReport::default();
            for (query_id, group) in &by_query {
                let current = capacity::payload_count(tx, *query_id)?;
                let admission = governor.admit_rows(current, group);
                let inserted = insert_rows(tx, &admission.admitted)?;
                log_dropped(*query_id, admission.dropped, &governor);
                report.add(inserted, admission.dropped);
            }
            Ok(report)
        })
}

/// Replace each touched (query, host) pair's rows with the new ones.
///
/// The cap is checked against the query's stored count minus the rows being
/// replaced. Pairs are processed in ascending order inside one transaction.
pub fn overwrite_query_result_rows(
    store: &Store,
    rows: &[ResultRow],
) -> Result<IngestReport, FleetError> {
    if rows.is_empty() {
        return Ok(IngestReport::default());
    }
    let governor = CapacityGovernor::new(store.max_rows());
    let by_pair = group_by_query_and_host(rows);

    store
        .broker()
        .with_tx(DEFAULT_ACTOR, "results.overwrite", |tx| {
            let mut report = IngestReport::default();
            for (&(query_id, host_id), group) in &by_pair {
                let current = capacity::payload_count(tx, query_id)?;
                let replaced = capacity::payload_count_for_host(tx, query_id, host_id)?;
                let admission = governor.admit_rows(current.saturating_sub(replaced), group);

                tx.execute(
                    "DELETE FROM query_results WHERE query_id = ?1 AND host_id = ?2",
                    params![query_id, host_id],
                )?;
                let inserted = insert_rows(tx, &admission.admitted)?;
                log_dropped(query_id, admission.dropped, &governor);
                report.add(inserted, admission.dropped);
            }
            Ok(report)
        })
}

/// Payload-bearing rows for a query, in insertion order.
pub fn query_result_rows(store: &Store, query_id: QueryId) -> Result<Vec<ResultRow>, FleetError> {
    store.broker().with_read("results.rows", |conn| {
        select_rows(
            conn,
            "SELECT query_id, host_id, last_fetched, data FROM query_results
             WHERE query_id = ?1 AND data IS NOT NULL
             ORDER BY id",
            params![query_id],
        )
    })
}

/// Every row for one (query, host) pair, placeholders included, in insertion order.
pub fn query_result_rows_for_host(
    store: &Store,
    query_id: QueryId,
    host_id: HostId,
) -> Result<Vec<ResultRow>, FleetError> {
    store.broker().with_read("results.rows_for_host", |conn| {
        select_rows(
            conn,
            "SELECT query_id, host_id, last_fetched, data FROM query_results
             WHERE query_id = ?1 AND host_id = ?2
             ORDER BY id",
            params![query_id, host_id],
        )
    })
}

pub fn result_count_for_query(store: &Store, query_id: QueryId) -> Result<usize, FleetError> {
    store
        .broker()
        .with_read("results.count", |conn| capacity::payload_count(conn, query_id))
}

pub fn result_count_for_query_and_host(
    store: &Store,
    query_id: QueryId,
    host_id: HostId,
) -> Result<usize, FleetError> {
    store.broker().with_read("results.count_for_host", |conn| {
        capacity::payload_count_for_host(conn, query_id, host_id)
    })
}

fn group_by_query(rows: &[ResultRow]) -> BTreeMap<QueryId, Vec<&ResultRow>> {
    let mut groups: BTreeMap<QueryId, Vec<&ResultRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.query_id).or_default().push(row);
    }
    groups
}

fn group_by_query_and_host(rows: &[ResultRow]) -> BTreeMap<(QueryId, HostId), Vec<&ResultRow>> {
    let mut groups: BTreeMap<(QueryId, HostId), Vec<&ResultRow>> = BTreeMap::new();
    for row in rows {
        groups.entry((row.query_id, row.host_id)).or_default().push(row);
    }
    groups
}

/// Multi-row INSERT statements for `rows`, split only to respect the
/// bound-parameter ceiling. Row order is preserved across statements.
pub fn insert_statements(rows: &[&ResultRow]) -> Vec<Statement> {
    rows.chunks(statement::max_rows_per_statement(RESULT_COLUMNS, 0))
        .map(|chunk| {
            let sql = format!(
                "INSERT INTO query_results (query_id, host_id, last_fetched, data) VALUES {}",
                statement::row_placeholders(chunk.len(), RESULT_COLUMNS)
            );
            let mut values = Vec::with_capacity(chunk.len() * RESULT_COLUMNS);
            for row in chunk {
                values.push(Value::Integer(row.query_id));
                values.push(Value::Integer(row.host_id));
                values.push(Value::Integer(row.last_fetched));
                values.push(match &row.data {
                    Some(bytes) => Value::Blob(bytes.clone()),
                    None => Value::Null,
                });
            }
            Statement::new(sql, values)
        })
        .collect()
}

fn insert_rows(sink: &impl StatementSink, rows: &[&ResultRow]) -> Result<usize, FleetError> {
    let mut inserted = 0;
    for stmt in insert_statements(rows) {
        inserted += sink.exec(&stmt)?;
    }
    Ok(inserted)
}

fn log_dropped(query_id: QueryId, dropped: usize, governor: &CapacityGovernor) {
    if dropped > 0 {
        tracing::warn!(
            query_id,
            dropped,
            max_rows = governor.max_rows(),
            "query report is full, dropping result rows"
        );
    }
}

fn select_rows<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<ResultRow>, FleetError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok(ResultRow {
            query_id: row.get(0)?,
            host_id: row.get(1)?,
            last_fetched: row.get(2)?,
            data: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for r in rows {
        results.push(r?);
    }
    Ok(results)
}
