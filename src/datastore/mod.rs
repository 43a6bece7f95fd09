//! Fleet data subsystems built on the core store.
//!
//! - `capacity`: the per-query row cap (Capacity Governor)
//! - `results`: bounded result ingestion and the result reader
//! - `labels`: label membership reconciliation and label reads
//! - `inventory`: the minimal host/query records the other subsystems reference

pub mod capacity;
pub mod inventory;
pub mod labels;
pub mod results;

pub type HostId = i64;
pub type QueryId = i64;
pub type LabelId = i64;
