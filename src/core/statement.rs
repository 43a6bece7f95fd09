//! Parameterized batch statements and the sink that executes them.
//!
//! Multi-row writes are built as plain `Statement` values first and executed
//! afterwards. Keeping construction separate from execution lets a recording
//! sink stand in for SQLite, so the exact statement sequence of an operation
//! can be asserted without a database.

use crate::core::config::SQLITE_MAX_PARAMS;
use crate::core::error::FleetError;
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params_from_iter};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Anything that can execute a `Statement` and report affected rows.
pub trait StatementSink {
    fn exec(&self, stmt: &Statement) -> Result<usize, FleetError>;
}

impl StatementSink for Connection {
    fn exec(&self, stmt: &Statement) -> Result<usize, FleetError> {
        let mut prepared = self.prepare_cached(&stmt.sql)?;
        Ok(prepared.execute(params_from_iter(stmt.params.iter()))?)
    }
}

impl StatementSink for Transaction<'_> {
    fn exec(&self, stmt: &Statement) -> Result<usize, FleetError> {
        (**self).exec(stmt)
    }
}

/// `?,?,?` with `n` placeholders.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// `(?,?),(?,?)` for `rows` tuples of `cols` placeholders each.
pub fn row_placeholders(rows: usize, cols: usize) -> String {
    let tuple = format!("({})", placeholders(cols));
    vec![tuple.as_str(); rows].join(",")
}

/// Largest number of `cols`-wide tuples that fit in one statement after
/// `fixed` parameters are spent elsewhere in it.
pub fn max_rows_per_statement(cols: usize, fixed: usize) -> usize {
    (SQLITE_MAX_PARAMS.saturating_sub(fixed) / cols.max(1)).max(1)
}
