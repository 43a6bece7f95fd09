//! Label membership: reconciliation of dynamic labels, bulk replacement of
//! manual label lists, and membership reads.
//!
//! # Lock ordering
//!
//! Many hosts report at once and their reconciliations touch overlapping
//! `label_membership` rows. Every statement that names several labels lists
//! them in ascending id order, so all concurrent writers acquire row locks in
//! one shared total order. Do not emit membership statements in map
//! iteration order.
//!
//! # Replay
//!
//! A reconciliation is one transaction that may be replayed after
//! contention. Upserts and in-set deletes make it idempotent: running the
//! same plan twice leaves the same membership set and timestamp.

use crate::core::error::FleetError;
use crate::core::schemas;
use crate::core::statement::{self, Statement, StatementSink};
use crate::core::store::{DEFAULT_ACTOR, Store};
use crate::core::time::{self, Timestamp};
use crate::datastore::inventory::{self, Host};
use crate::datastore::{HostId, LabelId};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    #[default]
    Regular,
    Builtin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMembershipType {
    #[default]
    Dynamic,
    Manual,
}

impl LabelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelType::Regular => "regular",
            LabelType::Builtin => "builtin",
        }
    }

    fn parse(s: &str) -> rusqlite::Result<Self> {
        match s {
            "regular" => Ok(LabelType::Regular),
            "builtin" => Ok(LabelType::Builtin),
            other => Err(invalid_column("label_type", other)),
        }
    }
}

impl LabelMembershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMembershipType::Dynamic => "dynamic",
            LabelMembershipType::Manual => "manual",
        }
    }

    fn parse(s: &str) -> rusqlite::Result<Self> {
        match s {
            "dynamic" => Ok(LabelMembershipType::Dynamic),
            "manual" => Ok(LabelMembershipType::Manual),
            other => Err(invalid_column("label_membership_type", other)),
        }
    }
}

impl fmt::Display for LabelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LabelMembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_column(column: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(
        0,
        format!("{column}={value}"),
        rusqlite::types::Type::Text,
    )
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub description: String,
    pub query: String,
    pub platform: String,
    pub label_type: LabelType,
    pub label_membership_type: LabelMembershipType,
}

impl Label {
    /// Only custom dynamic labels are maintained by reconciliation.
    pub fn is_reconcilable(&self) -> bool {
        self.label_type == LabelType::Regular
            && self.label_membership_type == LabelMembershipType::Dynamic
    }
}

const LABEL_COLUMNS: &str =
    "l.id, l.name, l.description, l.query, l.platform, l.label_type, l.label_membership_type";

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
    let label_type: String = row.get(5)?;
    let membership_type: String = row.get(6)?;
    Ok(Label {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        query: row.get(3)?,
        platform: row.get(4)?,
        label_type: LabelType::parse(&label_type)?,
        label_membership_type: LabelMembershipType::parse(&membership_type)?,
    })
}

/// Declarative label definition used for bulk import and export.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LabelSpec {
    pub name: String,
    pub description: String,
    pub query: String,
    pub platform: String,
    pub label_type: LabelType,
    pub label_membership_type: LabelMembershipType,
    /// Member host names; only meaningful for custom manual labels.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

impl LabelSpec {
    fn has_manual_membership(&self) -> bool {
        self.label_type != LabelType::Builtin
            && self.label_membership_type == LabelMembershipType::Manual
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// The minimal set of membership changes for one host's evaluation results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipPlan {
    pub host_id: HostId,
    pub updated_at: Timestamp,
    /// Labels the host matched, ascending.
    pub inserts: Vec<LabelId>,
    /// Labels the host did not match or could not evaluate, ascending.
    pub deletes: Vec<LabelId>,
}

impl MembershipPlan {
    /// Partition tri-state match results. `None` (unknown) counts as a miss.
    pub fn from_results<S>(
        host_id: HostId,
        results: &HashMap<LabelId, Option<bool>, S>,
        updated_at: Timestamp,
    ) -> Self {
        let mut inserts = Vec::new();
        let mut deletes = Vec::new();
        for (&label_id, &matched) in results {
            if matched == Some(true) {
                inserts.push(label_id);
            } else {
                deletes.push(label_id);
            }
        }
        inserts.sort_unstable();
        deletes.sort_unstable();

        Self {
            host_id,
            updated_at,
            inserts,
            deletes,
        }
    }

    /// All label ids named by the plan, ascending.
    pub fn label_ids(&self) -> Vec<LabelId> {
        let mut ids: Vec<LabelId> = self.inserts.iter().chain(&self.deletes).copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drop labels reconciliation must not touch (built-in and manual ones).
    ///
    /// `known` maps every existing label named by the plan to whether it is
    /// reconcilable. A matched label that does not exist is an error; a
    /// missed one is kept so any stale row for it is removed.
    pub fn retain_reconcilable(&mut self, known: &FxHashMap<LabelId, bool>) -> Result<(), FleetError> {
        if let Some(missing) = self.inserts.iter().find(|id| !known.contains_key(id)) {
            return Err(FleetError::NotFound(format!("label {}", missing)));
        }
        self.inserts.retain(|id| known.get(id) == Some(&true));
        self.deletes.retain(|id| known.get(id).copied().unwrap_or(true));
        Ok(())
    }

    /// Membership statements in execution order: upsert, then delete.
    /// An empty side emits nothing.
    pub fn membership_statements(&self) -> Vec<Statement> {
        let mut stmts = Vec::new();
        let ts = Value::Integer(self.updated_at);
        let host = Value::Integer(self.host_id);

        for chunk in self.inserts.chunks(statement::max_rows_per_statement(3, 0)) {
            let sql = format!(
                "INSERT INTO label_membership (updated_at, label_id, host_id) VALUES {}
                 ON CONFLICT(label_id, host_id) DO UPDATE SET updated_at = excluded.updated_at",
                statement::row_placeholders(chunk.len(), 3)
            );
            let mut values = Vec::with_capacity(chunk.len() * 3);
            for &label_id in chunk {
                values.push(ts.clone());
                values.push(Value::Integer(label_id));
                values.push(host.clone());
            }
            stmts.push(Statement::new(sql, values));
        }

        for chunk in self.deletes.chunks(statement::max_rows_per_statement(1, 1)) {
            let sql = format!(
                "DELETE FROM label_membership WHERE host_id = ? AND label_id IN ({})",
                statement::placeholders(chunk.len())
            );
            let mut values = Vec::with_capacity(chunk.len() + 1);
            values.push(host.clone());
            values.extend(chunk.iter().map(|&id| Value::Integer(id)));
            stmts.push(Statement::new(sql, values));
        }

        stmts
    }

    /// Final statement: advance the host's last-evaluated timestamp.
    pub fn host_statement(&self) -> Statement {
        Statement::new(
            "UPDATE hosts SET label_updated_at = ? WHERE id = ?",
            vec![Value::Integer(self.updated_at), Value::Integer(self.host_id)],
        )
    }

    /// Every statement the plan emits, in order.
    pub fn statements(&self) -> Vec<Statement> {
        let mut stmts = self.membership_statements();
        stmts.push(self.host_statement());
        stmts
    }

    /// Execute the plan. The caller provides the transaction.
    pub fn apply<S: StatementSink + ?Sized>(&self, sink: &S) -> Result<(), FleetError> {
        for stmt in self.membership_statements() {
            sink.exec(&stmt)?;
        }
        if sink.exec(&self.host_statement())? == 0 {
            return Err(FleetError::NotFound(format!("host {}", self.host_id)));
        }
        Ok(())
    }
}

/// Which of `ids` exist, and whether each is reconcilable.
fn reconcilable_labels(conn: &Connection, ids: &[LabelId]) -> Result<FxHashMap<LabelId, bool>, FleetError> {
    let mut known = FxHashMap::default();
    for chunk in ids.chunks(statement::max_rows_per_statement(1, 0)) {
        let sql = format!(
            "SELECT {LABEL_COLUMNS} FROM labels l WHERE l.id IN ({})",
            statement::placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), label_from_row)?;
        for r in rows {
            let label = r?;
            known.insert(label.id, label.is_reconcilable());
        }
    }
    Ok(known)
}

/// Apply one host's dynamic label results and stamp the host.
///
/// Labels absent from `results` are untouched. Built-in and manual labels in
/// `results` are skipped. Fails with `NotFound` (and changes nothing) if the
/// host does not exist or a matched label does not exist.
pub fn record_label_query_executions<S>(
    store: &Store,
    host_id: HostId,
    results: &HashMap<LabelId, Option<bool>, S>,
    updated_at: Timestamp,
) -> Result<MembershipPlan, FleetError> {
    let planned = MembershipPlan::from_results(host_id, results, updated_at);
    let label_ids = planned.label_ids();

    store
        .broker()
        .with_tx(DEFAULT_ACTOR, "labels.record_executions", |tx| {
            let mut plan = planned.clone();
            if !label_ids.is_empty() {
                let known = reconcilable_labels(tx, &label_ids)?;
                plan.retain_reconcilable(&known)?;
            }
            plan.apply(tx)?;
            tracing::debug!(
                host_id,
                inserts = plan.inserts.len(),
                deletes = plan.deletes.len(),
                "label membership reconciled"
            );
            Ok(plan)
        })
}

// ---------------------------------------------------------------------------
// Bulk specs
// ---------------------------------------------------------------------------

/// Split host names into fixed-size batches; the last one may be short.
pub fn batch_hostnames(hostnames: &[String], batch_size: usize) -> Vec<&[String]> {
    hostnames.chunks(batch_size.max(1)).collect()
}

/// Upsert label definitions by name and replace manual membership lists.
///
/// Host lists are inserted in `host_batch_size` batches with insert-or-ignore,
/// so a name repeated across batches is harmless. Unknown host names are
/// skipped. All specs commit together.
pub fn apply_label_specs(store: &Store, specs: &[LabelSpec]) -> Result<(), FleetError> {
    for spec in specs {
        if spec.name.is_empty() {
            return Err(FleetError::ValidationError(
                "label name must not be empty".into(),
            ));
        }
        if spec.name == schemas::ALL_HOSTS_LABEL_NAME && spec.label_type != LabelType::Builtin {
            return Err(FleetError::ValidationError(format!(
                "'{}' is a built-in label and cannot be redefined as {}",
                spec.name, spec.label_type
            )));
        }
    }
    let batch_size = store.config.host_batch_size;
    let now = time::now_epoch_secs();

    store
        .broker()
        .with_tx(DEFAULT_ACTOR, "labels.apply_specs", |tx| {
            for spec in specs {
                tx.execute(
                    "INSERT INTO labels(name, description, query, platform, label_type, label_membership_type)
                     VALUES(?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(name) DO UPDATE SET
                         description = excluded.description,
                         query = excluded.query,
                         platform = excluded.platform,
                         label_type = excluded.label_type,
                         label_membership_type = excluded.label_membership_type",
                    params![
                        spec.name,
                        spec.description,
                        spec.query,
                        spec.platform,
                        spec.label_type.as_str(),
                        spec.label_membership_type.as_str()
                    ],
                )?;

                if !spec.has_manual_membership() {
                    continue;
                }

                let label_id: LabelId = tx.query_row(
                    "SELECT id FROM labels WHERE name = ?1",
                    params![spec.name],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "DELETE FROM label_membership WHERE label_id = ?1",
                    params![label_id],
                )?;

                for batch in batch_hostnames(&spec.hosts, batch_size) {
                    let sql = format!(
                        "INSERT OR IGNORE INTO label_membership (label_id, host_id, updated_at)
                         SELECT ?, id, ? FROM hosts WHERE hostname IN ({})",
                        statement::placeholders(batch.len())
                    );
                    let mut values = Vec::with_capacity(batch.len() + 2);
                    values.push(Value::Integer(label_id));
                    values.push(Value::Integer(now));
                    values.extend(batch.iter().map(|name| Value::Text(name.clone())));
                    tx.exec(&Statement::new(sql, values))?;
                }
            }
            Ok(())
        })
}

pub fn get_label_specs(store: &Store) -> Result<Vec<LabelSpec>, FleetError> {
    store.broker().with_read("labels.specs", |conn| {
        let mut stmt = conn.prepare(&format!("SELECT {LABEL_COLUMNS} FROM labels l ORDER BY l.id"))?;
        let labels = stmt
            .query_map([], label_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        labels
            .into_iter()
            .map(|label| spec_for_label(conn, label))
            .collect()
    })
}

pub fn get_label_spec(store: &Store, name: &str) -> Result<LabelSpec, FleetError> {
    store.broker().with_read("labels.spec", |conn| {
        let label = conn
            .query_row(
                &format!("SELECT {LABEL_COLUMNS} FROM labels l WHERE l.name = ?1"),
                params![name],
                label_from_row,
            )
            .optional()?
            .ok_or_else(|| FleetError::NotFound(format!("label '{}'", name)))?;
        spec_for_label(conn, label)
    })
}

fn spec_for_label(conn: &Connection, label: Label) -> Result<LabelSpec, FleetError> {
    let mut spec = LabelSpec {
        name: label.name,
        description: label.description,
        query: label.query,
        platform: label.platform,
        label_type: label.label_type,
        label_membership_type: label.label_membership_type,
        hosts: Vec::new(),
    };
    if spec.has_manual_membership() {
        let mut stmt = conn.prepare(
            "SELECT h.hostname FROM label_membership lm JOIN hosts h ON lm.host_id = h.id
             WHERE lm.label_id = ?1 ORDER BY h.hostname",
        )?;
        spec.hosts = stmt
            .query_map(params![label.id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
    }
    Ok(spec)
}

// ---------------------------------------------------------------------------
// Reads and maintenance
// ---------------------------------------------------------------------------

/// The built-in label every host belongs to.
pub fn all_hosts_label(store: &Store) -> Result<Label, FleetError> {
    store.broker().with_read("labels.all_hosts", |conn| {
        conn.query_row(
            &format!("SELECT {LABEL_COLUMNS} FROM labels l WHERE l.name = ?1 AND l.label_type = 'builtin'"),
            params![schemas::ALL_HOSTS_LABEL_NAME],
            label_from_row,
        )
        .optional()?
        .ok_or_else(|| FleetError::NotFound(format!("label '{}'", schemas::ALL_HOSTS_LABEL_NAME)))
    })
}

pub fn label_ids_by_name(store: &Store, names: &[String]) -> Result<Vec<LabelId>, FleetError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    store.broker().with_read("labels.ids_by_name", |conn| {
        let mut ids: Vec<LabelId> = Vec::new();
        for chunk in names.chunks(statement::max_rows_per_statement(1, 0)) {
            let sql = format!(
                "SELECT id FROM labels WHERE name IN ({}) ORDER BY id",
                statement::placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| row.get(0))?;
            for r in rows {
                ids.push(r?);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    })
}

/// Platform used for label matching. RHEL-family hosts reporting a CentOS
/// version match `centos` labels.
pub fn platform_for_host(host: &Host) -> &str {
    if host.platform != "rhel" {
        return &host.platform;
    }
    if host.os_version.to_lowercase().contains("centos") {
        return "centos";
    }
    &host.platform
}

/// Criteria the host's agent must evaluate: custom dynamic labels for its
/// platform or for every platform.
pub fn label_queries_for_host(store: &Store, host: &Host) -> Result<BTreeMap<LabelId, String>, FleetError> {
    let platform = platform_for_host(host).to_string();
    store.broker().with_read("labels.queries_for_host", |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, query FROM labels
             WHERE (platform = ?1 OR platform = '')
               AND label_type = 'regular' AND label_membership_type = 'dynamic'",
        )?;
        let rows = stmt.query_map(params![platform], |row| {
            Ok((row.get::<_, LabelId>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = BTreeMap::new();
        for r in rows {
            let (id, query) = r?;
            out.insert(id, query);
        }
        Ok(out)
    })
}

pub fn list_labels_for_host(store: &Store, host_id: HostId) -> Result<Vec<Label>, FleetError> {
    store.broker().with_read("labels.for_host", |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels l JOIN label_membership lm ON lm.label_id = l.id
             WHERE lm.host_id = ?1 ORDER BY l.id"
        ))?;
        let labels = stmt
            .query_map(params![host_id], label_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(labels)
    })
}

/// Hosts in a label that still exist.
pub fn list_hosts_in_label(store: &Store, label_id: LabelId) -> Result<Vec<Host>, FleetError> {
    store.broker().with_read("labels.hosts", |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM label_membership lm JOIN hosts h ON lm.host_id = h.id
             WHERE lm.label_id = ?1 ORDER BY h.id",
            inventory::HOST_COLUMNS
        ))?;
        let hosts = stmt
            .query_map(params![label_id], inventory::host_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hosts)
    })
}

pub fn count_hosts_in_label(store: &Store, label_id: LabelId) -> Result<usize, FleetError> {
    store.broker().with_read("labels.count_hosts", |conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM label_membership lm JOIN hosts h ON lm.host_id = h.id
             WHERE lm.label_id = ?1",
            params![label_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    })
}

/// Periodic sweep: drop memberships whose label or host no longer exists.
pub fn cleanup_orphan_label_membership(store: &Store) -> Result<usize, FleetError> {
    let removed = store
        .broker()
        .with_tx(DEFAULT_ACTOR, "labels.cleanup_orphans", |tx| {
            Ok(tx.execute(
                "DELETE FROM label_membership
                 WHERE NOT EXISTS (SELECT 1 FROM labels WHERE id = label_id)
                    OR NOT EXISTS (SELECT 1 FROM hosts WHERE id = host_id)",
                [],
            )?)
        })?;
    if removed > 0 {
        tracing::debug!(removed, "orphan label memberships removed");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records statements instead of executing them.
    #[derive(Default)]
    struct RecordingSink {
        stmts: RefCell<Vec<Statement>>,
        host_rows: usize,
    }

    impl StatementSink for RecordingSink {
        fn exec(&self, stmt: &Statement) -> Result<usize, FleetError> {
            self.stmts.borrow_mut().push(stmt.clone());
            if stmt.sql.starts_with("UPDATE hosts") {
                Ok(self.host_rows)
            } else {
                Ok(1)
            }
        }
    }

    fn results(pairs: &[(LabelId, Option<bool>)]) -> HashMap<LabelId, Option<bool>> {
        pairs.iter().copied().collect()
    }

    fn ints(values: &[Value]) -> Vec<i64> {
        values
            .iter()
            .map(|v| match v {
                Value::Integer(i) => *i,
                other => panic!("unexpected param {other:?}"),
            })
            .collect()
    }

    #[test]
    fn plan_partitions_and_sorts_regardless_of_input_order() {
        let input = results(&[
            (9, Some(true)),
            (3, Some(false)),
            (1, Some(true)),
            (7, None),
            (5, Some(true)),
            (2, Some(false)),
        ]);
        let plan = MembershipPlan::from_results(7, &input, 100);
        assert_eq!(plan.inserts, vec![1, 5, 9]);
        assert_eq!(plan.deletes, vec![2, 3, 7]);
        assert_eq!(plan.label_ids(), vec![1, 2, 3, 5, 7, 9]);
    }

    #[test]
    fn statements_are_emitted_in_ascending_label_order() {
        let sink = RecordingSink {
            host_rows: 1,
            ..Default::default()
        };
        let input = results(&[(4, Some(true)), (2, Some(true)), (3, Some(false)), (1, Some(false))]);
        MembershipPlan::from_results(7, &input, 100).apply(&sink).unwrap();

        let stmts = sink.stmts.into_inner();
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].sql.starts_with("INSERT INTO label_membership"));
        assert_eq!(ints(&stmts[0].params), vec![100, 2, 7, 100, 4, 7]);
        assert!(stmts[1].sql.starts_with("DELETE FROM label_membership"));
        assert!(stmts[1].sql.ends_with("IN (?,?)"));
        assert_eq!(ints(&stmts[1].params), vec![7, 1, 3]);
        assert!(stmts[2].sql.starts_with("UPDATE hosts"));
        assert_eq!(ints(&stmts[2].params), vec![100, 7]);
    }

    #[test]
    fn empty_sides_emit_no_statement() {
        let only_matches = MembershipPlan::from_results(7, &results(&[(1, Some(true))]), 5);
        let stmts = only_matches.statements();
        assert_eq!(stmts.len(), 2);
        assert!(stmts.iter().all(|s| !s.sql.starts_with("DELETE")));

        let nothing = MembershipPlan::from_results(7, &results(&[]), 5);
        let stmts = nothing.statements();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].sql.starts_with("UPDATE hosts"));
    }

    #[test]
    fn unknown_host_fails_after_membership_statements() {
        let sink = RecordingSink::default();
        let err = MembershipPlan::from_results(7, &results(&[(1, Some(true))]), 5)
            .apply(&sink)
            .unwrap_err();
        assert!(matches!(err, FleetError::NotFound(ref m) if m == "host 7"));
    }

    #[test]
    fn retain_skips_non_reconcilable_and_rejects_unknown_matches() {
        let mut known = FxHashMap::default();
        known.insert(1, true);
        known.insert(2, false); // built-in or manual
        known.insert(3, true);

        let mut plan = MembershipPlan::from_results(
            7,
            &results(&[(1, Some(true)), (2, Some(true)), (3, Some(false)), (8, Some(false))]),
            5,
        );
        plan.retain_reconcilable(&known).unwrap();
        assert_eq!(plan.inserts, vec![1]);
        assert_eq!(plan.deletes, vec![3, 8]);

        let mut bad = MembershipPlan::from_results(7, &results(&[(8, Some(true))]), 5);
        let err = bad.retain_reconcilable(&known).unwrap_err();
        assert!(matches!(err, FleetError::NotFound(ref m) if m == "label 8"));
    }

    #[test]
    fn hostname_batches_are_fixed_size_with_short_tail() {
        let names: Vec<String> = (0..5).map(|i| format!("host-{i}")).collect();
        let batches = batch_hostnames(&names, 2);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[2][0], "host-4");

        assert_eq!(batch_hostnames(&names, 5).len(), 1);
        assert!(batch_hostnames(&[], 2).is_empty());
    }

    #[test]
    fn centos_hosts_match_centos_platform() {
        let mut host = Host {
            id: 1,
            hostname: "h".into(),
            platform: "rhel".into(),
            os_version: "CentOS Linux 7.9".into(),
            label_updated_at: 0,
        };
        assert_eq!(platform_for_host(&host), "centos");
        host.os_version = "Red Hat Enterprise Linux 9".into();
        assert_eq!(platform_for_host(&host), "rhel");
        host.platform = "darwin".into();
        host.os_version = "centos".into();
        assert_eq!(platform_for_host(&host), "darwin");
    }
}
