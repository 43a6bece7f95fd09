use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("{op}: SQLite error: {source}")]
    Storage {
        op: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl FleetError {
    /// Tag a raw storage error with the logical operation it escaped from.
    pub fn with_op(self, op: &str) -> Self {
        match self {
            FleetError::RusqliteError(source) => FleetError::Storage {
                op: op.to_string(),
                source,
            },
            other => other,
        }
    }

    /// The underlying SQLite error, if this is a storage failure.
    pub fn sqlite_error(&self) -> Option<&rusqlite::Error> {
        match self {
            FleetError::RusqliteError(e) => Some(e),
            FleetError::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}
