//! Per-operation SQLite connections with transaction retry.
//!
//! Every logical operation opens its own connection, so callers on many
//! threads never share one. There is no in-process write lock: SQLite's
//! transactions are the only serialization. Writers start with
//! `BEGIN IMMEDIATE` so lock acquisition happens up front, and a transaction
//! that loses to a concurrent writer (`SQLITE_BUSY` / `SQLITE_LOCKED`) is
//! rolled back and replayed from scratch with exponential backoff.
//!
//! Replay is only safe because every closure handed to `with_write_tx` is
//! idempotent given the same input.

use crate::core::config::Config;
use crate::core::db;
use crate::core::error::FleetError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Retry policy for busy/locked transactions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

/// Connection factory for one fleet database.
#[derive(Debug, Clone)]
pub struct SqlitePool {
    db_path: PathBuf,
    busy_timeout_ms: u64,
    retry: RetryPolicy,
}

impl SqlitePool {
    pub fn new(db_path: &Path, config: &Config) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            busy_timeout_ms: config.busy_timeout_ms,
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn connect(&self) -> Result<Connection, FleetError> {
        db::db_connect(&self.db_path, self.busy_timeout_ms)
    }

    /// Run `f` inside one write transaction, replaying it on busy/locked.
    ///
    /// `f` sees a fresh transaction on every attempt; nothing from a failed
    /// attempt is committed.
    pub fn with_write_tx<F, R>(&self, op: &str, mut f: F) -> Result<R, FleetError>
    where
        F: FnMut(&Transaction<'_>) -> Result<R, FleetError>,
    {
        let mut conn = self.connect()?;
        retry_on_busy(self.retry, op, || {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }

    /// Run `f` with a plain read connection (WAL allows concurrent readers).
    pub fn with_read<F, R>(&self, f: F) -> Result<R, FleetError>
    where
        F: FnOnce(&Connection) -> Result<R, FleetError>,
    {
        let conn = self.connect()?;
        f(&conn)
    }
}

/// Retry a closure on `SQLITE_BUSY` / `SQLITE_LOCKED` with exponential backoff.
pub fn retry_on_busy<F, R>(policy: RetryPolicy, op: &str, mut f: F) -> Result<R, FleetError>
where
    F: FnMut() -> Result<R, FleetError>,
{
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy_error(&e) && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay(attempt);
                tracing::warn!(op, attempt, delay_ms = delay.as_millis() as u64, error = %e, "transaction contended, retrying");
                thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if an error is a SQLite busy/locked error that is retryable.
pub fn is_busy_error(err: &FleetError) -> bool {
    match err.sqlite_error() {
        Some(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}
