use crate::core::error;
use crate::core::pool::SqlitePool;
use crate::core::schemas;
use crate::core::time;
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The DB Broker is the "Thin Waist" for state access.
///
/// Every logical operation goes through it: it owns the transaction, tags
/// escaping storage errors with the operation name, and records one audit
/// event per write.
#[derive(Debug, Clone)]
pub struct DbBroker {
    pool: SqlitePool,
    audit_log_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path, pool: SqlitePool, audit_log: bool) -> Self {
        Self {
            pool,
            audit_log_path: audit_log.then(|| root.join(schemas::BROKER_EVENTS_NAME)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Execute a closure inside one write transaction, retried on contention.
    pub fn with_tx<F, R>(&self, actor: &str, op_name: &str, f: F) -> Result<R, error::FleetError>
    where
        F: FnMut(&Transaction<'_>) -> Result<R, error::FleetError>,
    {
        let span = tracing::debug_span!("fleet_op", op = op_name, actor);
        let _enter = span.enter();

        let result = self
            .pool
            .with_write_tx(op_name, f)
            .map_err(|e| e.with_op(op_name));

        let status = if result.is_ok() { "success" } else { "error" };
        if let Err(e) = &result {
            tracing::debug!(error = %e, "operation failed");
        }
        // The outcome is final here; audit failures only warn.
        if let Err(e) = self.log_event(actor, op_name, status) {
            tracing::warn!(error = %e, "failed to append broker audit event");
        }

        result
    }

    /// Execute a closure with a read connection. Reads are not audited.
    pub fn with_read<F, R>(&self, op_name: &str, f: F) -> Result<R, error::FleetError>
    where
        F: FnOnce(&Connection) -> Result<R, error::FleetError>,
    {
        self.pool.with_read(f).map_err(|e| e.with_op(op_name))
    }

    fn log_event(&self, actor: &str, op: &str, status: &str) -> Result<(), error::FleetError> {
        let Some(path) = &self.audit_log_path else {
            return Ok(());
        };

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: self
                .pool
                .db_path()
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            status: status.to_string(),
        };

        // Single write per line so concurrent appenders never interleave.
        let mut line = serde_json::to_string(&ev)?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(error::FleetError::IoError)?;
        f.write_all(line.as_bytes())
            .map_err(error::FleetError::IoError)?;
        Ok(())
    }
}
