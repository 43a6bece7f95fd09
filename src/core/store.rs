//! Store handle for a fleet state workspace.
//!
//! A store is a directory holding `fleet.db`, an optional `fleetstore.toml`
//! and the broker audit log. The handle is cheap to clone and safe to share
//! across threads: each operation opens its own connection.

use crate::core::broker::DbBroker;
use crate::core::config::{self, Config};
use crate::core::db;
use crate::core::error::FleetError;
use crate::core::pool::SqlitePool;
use std::path::{Path, PathBuf};

/// Actor recorded in audit events for operations issued by this crate.
pub const DEFAULT_ACTOR: &str = "fleetstore";

#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
    pub config: Config,
    broker: DbBroker,
}

impl Store {
    /// Open (or create) a store, reading `fleetstore.toml` from the root.
    pub fn open(root: &Path) -> Result<Self, FleetError> {
        db::storage_health_preflight(root)?;
        let config = config::load_config(root)?;
        Self::open_with_config(root, config)
    }

    /// Open (or create) a store with an injected configuration.
    pub fn open_with_config(root: &Path, config: Config) -> Result<Self, FleetError> {
        config.validate()?;
        db::storage_health_preflight(root)?;

        let pool = SqlitePool::new(&db::fleet_db_path(root), &config);
        let broker = DbBroker::new(root, pool, config.audit_log);
        broker.with_tx(DEFAULT_ACTOR, "store.init", |tx| db::ensure_schema(tx))?;

        tracing::debug!(root = %root.display(), "store opened");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            broker,
        })
    }

    pub fn broker(&self) -> &DbBroker {
        &self.broker
    }

    /// The Capacity Governor's `MaxRows`.
    pub fn max_rows(&self) -> usize {
        self.config.max_query_report_rows
    }
}
