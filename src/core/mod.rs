//! Core modules shared by every fleet subsystem.
//!
//! Storage access, transactions with retry, configuration, errors and the
//! audit broker live here. Domain logic lives in `datastore`.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod pool;
pub mod schemas;
pub mod statement;
pub mod store;
pub mod time;
