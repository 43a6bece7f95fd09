//! fleetstore: persistence core for a device-fleet management server.
//!
//! Two concurrency-sensitive write paths sit on one SQLite database:
//!
//! - **Label membership**: each host periodically reports which dynamic
//!   labels it matches; [`datastore::labels::record_label_query_executions`]
//!   turns that report into the minimal membership change.
//! - **Query results**: hosts upload result rows for scheduled queries;
//!   [`datastore::results`] stores them while the Capacity Governor keeps
//!   every query under a hard cap of payload-bearing rows.
//!
//! # The Thin Waist
//!
//! Every operation goes through `DbBroker`, which owns the write transaction
//! (`BEGIN IMMEDIATE`), replays it on lock contention, tags escaping errors
//! with the operation name and appends an audit event to
//! `broker.events.jsonl`.
//!
//! # Examples
//!
//! ```bash
//! fleetstore --root ./fleet init
//! fleetstore --root ./fleet host enroll --hostname web-1 --platform ubuntu
//! fleetstore --root ./fleet results save --file rows.jsonl
//! fleetstore --root ./fleet labels record --host 1 --file matches.json
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store, broker, pool, config, errors
//! - [`datastore`]: capacity, results, labels and inventory

pub mod core;
pub mod datastore;

mod cli;

use crate::cli::{Cli, Command, HostCommand, LabelsCommand, QueryCommand, ResultsCommand};
use crate::core::error::FleetError;
use crate::core::store::Store;
use crate::core::time::{self, Timestamp};
use crate::datastore::labels::{self, LabelSpec};
use crate::datastore::results::{self, ResultRow};
use crate::datastore::{HostId, LabelId, QueryId, inventory};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One line of a result-row file. `data: null` (or a missing `data`) is a
/// placeholder row; any other JSON value is stored as its serialized text.
#[derive(Debug, Serialize, Deserialize)]
struct RowRecord {
    query_id: QueryId,
    host_id: HostId,
    #[serde(default)]
    last_fetched: Timestamp,
    #[serde(default)]
    data: Option<JsonValue>,
}

impl RowRecord {
    fn into_row(self) -> Result<ResultRow, FleetError> {
        Ok(match self.data {
            Some(value) => ResultRow::new(
                self.query_id,
                self.host_id,
                self.last_fetched,
                serde_json::to_vec(&value)?,
            ),
            None => ResultRow::placeholder(self.query_id, self.host_id, self.last_fetched),
        })
    }

    fn from_row(row: ResultRow) -> Self {
        let data = row.data.map(|bytes| {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()))
        });
        Self {
            query_id: row.query_id,
            host_id: row.host_id,
            last_fetched: row.last_fetched,
            data,
        }
    }
}

fn read_row_file(path: &Path) -> Result<Vec<ResultRow>, FleetError> {
    let content = fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: RowRecord = serde_json::from_str(line).map_err(|e| {
            FleetError::ValidationError(format!("{}:{}: {}", path.display(), idx + 1, e))
        })?;
        rows.push(record.into_row()?);
    }
    Ok(rows)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, FleetError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| FleetError::ValidationError(format!("{}: {}", path.display(), e)))
}

/// Response shape shared by every command: header fields plus the
/// command's own payload object flattened alongside them.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    ts: String,
    event_id: String,
    cmd: &'a str,
    status: &'a str,
    #[serde(flatten)]
    body: JsonValue,
}

impl<'a> Envelope<'a> {
    fn ok(cmd: &'a str, body: JsonValue) -> Self {
        Self {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            cmd,
            status: "ok",
            body,
        }
    }
}

fn emit(cmd: &str, body: JsonValue) -> Result<(), FleetError> {
    println!("{}", serde_json::to_string_pretty(&Envelope::ok(cmd, body))?);
    Ok(())
}

pub fn run() -> Result<(), FleetError> {
    let cli = Cli::parse();
    let store = Store::open(&cli.root)?;

    match cli.command {
        Command::Init => emit(
            "init",
            json!({
                "root": store.root.display().to_string(),
                "max_query_report_rows": store.max_rows(),
            }),
        ),
        Command::Host(host_cli) => run_host_cli(&store, host_cli.command),
        Command::Query(query_cli) => run_query_cli(&store, query_cli.command),
        Command::Results(results_cli) => run_results_cli(&store, results_cli.command),
        Command::Labels(labels_cli) => run_labels_cli(&store, labels_cli.command),
    }
}

fn run_host_cli(store: &Store, command: HostCommand) -> Result<(), FleetError> {
    match command {
        HostCommand::Enroll {
            hostname,
            platform,
            os_version,
        } => {
            let host = inventory::enroll_host(store, &hostname, &platform, &os_version)?;
            emit("host.enroll", json!({ "host": host }))
        }
        HostCommand::Show { id } => {
            let host = inventory::get_host(store, id)?;
            emit("host.show", json!({ "host": host }))
        }
        HostCommand::Delete { id } => {
            inventory::delete_host(store, id)?;
            emit("host.delete", json!({ "id": id }))
        }
    }
}

fn run_query_cli(store: &Store, command: QueryCommand) -> Result<(), FleetError> {
    match command {
        QueryCommand::Add { name, sql } => {
            let id = inventory::new_query(store, &name, &sql)?;
            emit("query.add", json!({ "id": id, "name": name }))
        }
        QueryCommand::Delete { id } => {
            inventory::delete_query(store, id)?;
            emit("query.delete", json!({ "id": id }))
        }
    }
}

fn run_results_cli(store: &Store, command: ResultsCommand) -> Result<(), FleetError> {
    match command {
        ResultsCommand::Save { file } => {
            let rows = read_row_file(&file)?;
            let report = results::save_query_result_rows(store, &rows)?;
            emit("results.save", json!({ "report": report }))
        }
        ResultsCommand::Overwrite { file } => {
            let rows = read_row_file(&file)?;
            let report = results::overwrite_query_result_rows(store, &rows)?;
            emit("results.overwrite", json!({ "report": report }))
        }
        ResultsCommand::Rows { query, host } => {
            let rows = match host {
                Some(host_id) => results::query_result_rows_for_host(store, query, host_id)?,
                None => results::query_result_rows(store, query)?,
            };
            let records: Vec<RowRecord> = rows.into_iter().map(RowRecord::from_row).collect();
            emit("results.rows", json!({ "rows": records }))
        }
        ResultsCommand::Count { query, host } => {
            let count = match host {
                Some(host_id) => results::result_count_for_query_and_host(store, query, host_id)?,
                None => results::result_count_for_query(store, query)?,
            };
            emit("results.count", json!({ "query_id": query, "host_id": host, "count": count }))
        }
    }
}

fn run_labels_cli(store: &Store, command: LabelsCommand) -> Result<(), FleetError> {
    match command {
        LabelsCommand::Apply { file } => {
            let specs: Vec<LabelSpec> = read_json_file(&file)?;
            labels::apply_label_specs(store, &specs)?;
            emit("labels.apply", json!({ "applied": specs.len() }))
        }
        LabelsCommand::Record { host, file, at } => {
            let matches: HashMap<LabelId, Option<bool>> = read_json_file(&file)?;
            let updated_at = at.unwrap_or_else(time::now_epoch_secs);
            let plan = labels::record_label_query_executions(store, host, &matches, updated_at)?;
            emit("labels.record", json!({ "plan": plan }))
        }
        LabelsCommand::ForHost { host } => {
            let found = labels::list_labels_for_host(store, host)?;
            emit("labels.for_host", json!({ "host_id": host, "labels": found }))
        }
        LabelsCommand::Queries { host } => {
            let host = inventory::get_host(store, host)?;
            let queries = labels::label_queries_for_host(store, &host)?;
            emit("labels.queries", json!({ "host_id": host.id, "queries": queries }))
        }
        LabelsCommand::Hosts { label } => {
            let hosts = labels::list_hosts_in_label(store, label)?;
            emit("labels.hosts", json!({ "label_id": label, "hosts": hosts }))
        }
        LabelsCommand::Cleanup => {
            let removed = labels::cleanup_orphan_label_membership(store)?;
            emit("labels.cleanup", json!({ "removed": removed }))
        }
        LabelsCommand::Specs { name } => {
            let specs = match name {
                Some(name) => vec![labels::get_label_spec(store, &name)?],
                None => labels::get_label_specs(store)?,
            };
            emit("labels.specs", json!({ "specs": specs }))
        }
    }
}
