//! Clock and event-id helpers.

use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

/// Unix epoch seconds. All persisted timestamps use this unit.
pub type Timestamp = i64;

pub fn now_epoch_secs() -> Timestamp {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Timestamp::try_from(secs).unwrap_or(Timestamp::MAX)
}

/// Audit stamp: epoch seconds with a `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    format!("{}Z", now_epoch_secs())
}

/// Sortable unique id for audit events and CLI envelopes.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_stamp_is_seconds_with_suffix() {
        let stamp = now_epoch_z();
        let secs: Timestamp = stamp
            .strip_suffix('Z')
            .and_then(|s| s.parse().ok())
            .expect("numeric stamp");
        assert!(secs > 1_600_000_000);
    }

    #[test]
    fn event_ids_are_distinct_ulids() {
        let a = new_event_id();
        let b = new_event_id();
        assert_ne!(a, b);
        assert!(Ulid::from_string(&a).is_ok());
    }
}
